use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use crate::engine::{Engine, ResultSink};
use crate::error::DeliveryError;
use crate::types::{Job, Message, Outbound, Response};

pub const CHANNEL: &str = "cli";

pub struct Adapter {
    eng: Arc<dyn Engine>,
    out: Mutex<Box<dyn Write + Send>>,
    next_id: AtomicU64,
}

impl Adapter {
    pub fn new(eng: Arc<dyn Engine>) -> Self {
        Self {
            eng,
            out: Mutex::new(Box::new(io::stdout())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn run(&self, stop: &AtomicBool) -> io::Result<()> {
        self.say("imankeum CLI. Try: /선미 50 (3/3) 영지 20 (1/3)")?;

        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines().map_while(Result::ok) {
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(line).is_err() {
                    return;
                }
            }
        });

        while !stop.load(Ordering::Relaxed) {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(line) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let resp = self.eng.handle(Message {
                        id: id.to_string(),
                        user_id: "cli".to_string(),
                        channel: CHANNEL.to_string(),
                        text: line,
                        author_is_bot: false,
                    });
                    for m in &resp.messages {
                        self.say(&m.content)?;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn say(&self, text: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("stdout lock poisoned"))?;
        writeln!(out, "{text}")
    }
}

/// Prints report messages and saves attachments under `out_dir`.
pub struct Sink {
    out: Mutex<Box<dyn Write + Send>>,
    out_dir: PathBuf,
}

impl Sink {
    pub fn new(out_dir: PathBuf) -> Self {
        Self::with_writer(out_dir, Box::new(io::stdout()))
    }

    pub fn with_writer(out_dir: PathBuf, w: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(w),
            out_dir,
        }
    }

    fn write_one(&self, out: &mut dyn Write, m: &Outbound) -> Result<(), DeliveryError> {
        writeln!(out, "{}", m.content)?;
        if let Some(att) = &m.attachment {
            fs::create_dir_all(&self.out_dir)?;
            let path = self.out_dir.join(&att.name);
            fs::write(&path, &att.bytes)?;
            writeln!(out, "[attachment: {}]", path.display())?;
        }
        Ok(())
    }
}

impl ResultSink for Sink {
    fn deliver(&self, _job: &Job, resp: &Response) -> Result<(), DeliveryError> {
        let mut out = self.out.lock().map_err(|_| DeliveryError::Poisoned)?;
        for m in &resp.messages {
            self.write_one(&mut **out, m)?;
        }
        out.flush()?;
        Ok(())
    }
}
