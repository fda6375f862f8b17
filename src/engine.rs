use std::sync::{Arc, RwLock, mpsc};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use crate::error::DeliveryError;
use crate::registry::Registry;
use crate::router::Router;
use crate::tasks::TaskOutput;
use crate::types::{Job, Message, Response};
use crate::worker::{Pool, ResultItem};

pub trait Engine: Send + Sync {
    /// Immediate answer to an inbound message. Accepted commands answer with
    /// an empty response; their report arrives later through the sink.
    fn handle(&self, msg: Message) -> Response;
}

pub trait ResultSink: Send + Sync {
    /// Sends every message of `resp` to the job's channel, in order.
    fn deliver(&self, job: &Job, resp: &Response) -> Result<(), DeliveryError>;
}

pub struct Core {
    router: Arc<dyn Router>,
    reg: Arc<Registry>,
    pool: RwLock<Pool>,
    sink: RwLock<Option<Arc<dyn ResultSink>>>,
    dispatch_join: RwLock<Option<JoinHandle<()>>>,
}

impl Core {
    pub fn new(
        router: Arc<dyn Router>,
        reg: Arc<Registry>,
        mut pool: Pool,
        results_rx: mpsc::Receiver<ResultItem>,
        sink: Option<Arc<dyn ResultSink>>,
    ) -> Arc<Self> {
        pool.start();
        let c = Arc::new(Self {
            router,
            reg,
            pool: RwLock::new(pool),
            sink: RwLock::new(sink),
            dispatch_join: RwLock::new(None),
        });

        let c2 = Arc::clone(&c);
        let j = thread::spawn(move || c2.dispatch_results(results_rx));
        if let Ok(mut g) = c.dispatch_join.write() {
            *g = Some(j);
        }
        c
    }

    pub fn set_sink(&self, s: Option<Arc<dyn ResultSink>>) {
        if let Ok(mut g) = self.sink.write() {
            *g = s;
        }
    }

    pub fn shutdown(&self) {
        if let Ok(mut p) = self.pool.write() {
            p.shutdown();
        }
        if let Ok(mut j) = self.dispatch_join.write() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
        tracing::info!("engine stopped");
    }

    fn dispatch_results(&self, results_rx: mpsc::Receiver<ResultItem>) {
        for res in results_rx {
            let messages = match res.output {
                Ok(TaskOutput::Messages(m)) => m,
                Err(e) => {
                    tracing::error!(job_id = %res.job.id, error = %e, "task failed, nothing sent");
                    continue;
                }
            };
            if messages.is_empty() {
                continue;
            }
            let resp = Response {
                messages,
                reply: false,
            };

            let sink = self.sink.read().ok().and_then(|g| g.as_ref().cloned());
            let Some(sink) = sink else {
                tracing::warn!(job_id = %res.job.id, "no sink attached, dropping result");
                continue;
            };

            // One report at a time, so its messages never interleave with the next.
            // A stuck transport is bounded by the HTTP client timeout.
            let since_command_ms = res
                .job
                .created_at
                .elapsed()
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            match sink.deliver(&res.job, &resp) {
                Ok(()) => tracing::info!(
                    job_id = %res.job.id,
                    task_ms = res.dur.as_millis() as u64,
                    since_command_ms,
                    "report delivered"
                ),
                Err(e) => tracing::error!(job_id = %res.job.id, error = %e, "report delivery failed"),
            }
        }
    }
}

impl Engine for Core {
    fn handle(&self, msg: Message) -> Response {
        let route = match self.router.route(&msg) {
            Ok(None) => return Response::default(),
            Ok(Some(r)) => r,
            Err(e) => return Response::reply(e),
        };

        let Some(task) = self.reg.lookup(&route.task_name) else {
            tracing::error!(task = %route.task_name, "routed to unregistered task");
            return Response::default();
        };

        if let Err(e) = task.validate(&route.input) {
            tracing::warn!(error = %e, "route rejected by task");
            return Response::default();
        }

        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            task_name: route.task_name,
            input: route.input,
            user_id: msg.user_id,
            channel_id: msg.channel,
            created_at: SystemTime::now(),
        };
        tracing::info!(
            job_id = %job.id,
            message_id = %msg.id,
            user = %job.user_id,
            channel = %job.channel_id,
            "report queued"
        );

        let submitted = match self.pool.read() {
            Ok(p) => p.submit(job),
            Err(_) => {
                tracing::error!("worker pool unavailable");
                return Response::default();
            }
        };
        if let Err(e) = submitted {
            tracing::error!(error = %e, "failed to queue report");
        }
        Response::default()
    }
}
