use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{QueueError, TaskError};
use crate::queue::Queue;
use crate::registry::Registry;
use crate::tasks::{TaskContext, TaskOutput};
use crate::types::Job;

#[derive(Debug)]
pub struct ResultItem {
    pub job: Job,
    pub output: Result<TaskOutput, TaskError>,
    pub dur: Duration,
}

pub struct Pool {
    q: Arc<Queue>,
    reg: Arc<Registry>,
    workers: usize,

    canceled: Arc<AtomicBool>,
    results_tx: Option<mpsc::Sender<ResultItem>>,
    joins: Vec<JoinHandle<()>>,
}

impl Pool {
    pub fn new(
        reg: Arc<Registry>,
        q: Arc<Queue>,
        workers: usize,
    ) -> (Self, mpsc::Receiver<ResultItem>) {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel();
        (
            Self {
                q,
                reg,
                workers,
                canceled: Arc::new(AtomicBool::new(false)),
                results_tx: Some(tx),
                joins: Vec::new(),
            },
            rx,
        )
    }

    pub fn start(&mut self) {
        let Some(tx) = self.results_tx.as_ref() else {
            return;
        };
        for worker_id in 1..=self.workers {
            let q = Arc::clone(&self.q);
            let reg = Arc::clone(&self.reg);
            let canceled = Arc::clone(&self.canceled);
            let tx = tx.clone();
            self.joins.push(thread::spawn(move || {
                run_worker(worker_id, q, reg, canceled, tx);
            }));
        }
        tracing::debug!(workers = self.workers, "worker pool started");
    }

    pub fn submit(&self, job: Job) -> Result<(), QueueError> {
        self.q.enqueue(job, &self.canceled)
    }

    /// Closes the queue and waits for workers to drain the jobs already queued.
    pub fn shutdown(&mut self) {
        self.q.close();
        self.canceled.store(true, Ordering::Relaxed);

        // Closing the sender ends the dispatch loop once workers exit.
        self.results_tx.take();

        for j in self.joins.drain(..) {
            let _ = j.join();
        }
    }
}

fn run_worker(
    worker_id: usize,
    q: Arc<Queue>,
    reg: Arc<Registry>,
    canceled: Arc<AtomicBool>,
    results_tx: mpsc::Sender<ResultItem>,
) {
    loop {
        let job = match q.dequeue(&canceled) {
            Ok(j) => j,
            Err(QueueError::Closed | QueueError::Canceled) => return,
        };

        let start = Instant::now();
        let ctx = TaskContext {
            channel_id: job.channel_id.clone(),
        };
        let output = match reg.lookup(&job.task_name) {
            None => Err(TaskError::UnknownTask(job.task_name.clone())),
            Some(task) => task
                .validate(&job.input)
                .and_then(|()| task.run(&ctx, job.input.clone())),
        };
        let dur = start.elapsed();
        tracing::debug!(
            worker_id,
            job_id = %job.id,
            task = %job.task_name,
            ok = output.is_ok(),
            elapsed_ms = dur.as_millis() as u64,
            "job finished"
        );

        if results_tx.send(ResultItem { job, output, dur }).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::registry::fake::EchoTask;
    use crate::tasks::Task;
    use crate::types::{ReportEntry, TaskInput};

    fn job(task: &str, channel: &str) -> Job {
        Job {
            id: "j".to_string(),
            task_name: task.to_string(),
            input: TaskInput::Report(vec![ReportEntry {
                name: "민수".to_string(),
                minutes: 1,
                done: 0,
                total: 1,
            }]),
            user_id: "u".to_string(),
            channel_id: channel.to_string(),
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn runs_jobs_with_their_channel_context() {
        let reg = Arc::new(Registry::new());
        let task = Arc::new(EchoTask::default());
        reg.register(Arc::clone(&task) as Arc<dyn Task>).unwrap();
        let (mut pool, rx) = Pool::new(reg, Arc::new(Queue::new(4)), 1);
        pool.start();

        pool.submit(job("report", "study")).unwrap();
        let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let TaskOutput::Messages(msgs) = res.output.unwrap();
        assert_eq!(msgs[0].content, "민수");
        assert_eq!(task.channels.lock().unwrap().as_slice(), ["study"]);

        pool.shutdown();
    }

    #[test]
    fn unknown_task_reports_an_error() {
        let (mut pool, rx) = Pool::new(Arc::new(Registry::new()), Arc::new(Queue::new(4)), 0);
        pool.start();
        pool.submit(job("missing", "c")).unwrap();
        let res = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(res.output, Err(TaskError::UnknownTask(_))));
        pool.shutdown();
    }
}
