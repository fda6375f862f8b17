mod accumulator;
mod adapters;
mod chart;
mod config;
mod engine;
mod error;
mod history;
mod narrative;
mod parser;
mod period;
mod queue;
mod registry;
mod report;
mod router;
mod sentences;
mod tasks;
mod types;
mod unix_signal;
mod worker;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use accumulator::Accumulator;
use adapters::{cli, discord};
use chart::DonutRenderer;
use config::{Args, Mode};
use engine::{Core, Engine};
use history::MessageHistory;
use narrative::{Narrative, OpenAiNarrator};
use queue::Queue;
use registry::Registry;
use router::CommandRouter;
use sentences::SentenceBank;
use tasks::{ReportTask, Task};
use unix_signal::install_unix_signal_handlers;
use worker::Pool;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = args.select_mode()?;

    let stop = Arc::new(AtomicBool::new(false));
    install_unix_signal_handlers(&stop);

    // The discord client doubles as the history source for sentence selection.
    let discord_client = match mode {
        Mode::Discord => {
            let (token, _) = args.discord_settings()?;
            let client = discord::Client::new(token).context("building discord client")?;
            Some(Arc::new(client))
        }
        Mode::Cli => None,
    };
    let history = discord_client
        .clone()
        .map(|c| c as Arc<dyn MessageHistory>);

    let narrator = Arc::new(
        OpenAiNarrator::new(args.openai_api_key.clone(), args.openai_model.clone())
            .context("building narrative client")?,
    );
    let narrative = Narrative::new(narrator, SentenceBank::new(&args.data_dir), history);
    let report = ReportTask::new(
        Arc::new(Accumulator::in_memory()),
        narrative,
        Arc::new(DonutRenderer::default()),
        args.data_dir.clone(),
    );

    let reg = Arc::new(Registry::new());
    reg.register(Arc::new(report) as Arc<dyn Task>)?;

    let q = Arc::new(Queue::new(args.queue_size));
    let (pool, results_rx) = Pool::new(Arc::clone(&reg), q, args.concurrency);

    tracing::info!(
        ?mode,
        data_dir = %args.data_dir.display(),
        concurrency = args.concurrency,
        narrator = if args.openai_api_key.is_empty() { "sentence-bank" } else { "openai" },
        "starting"
    );

    match (mode, discord_client) {
        (Mode::Discord, Some(client)) => {
            let (_, channel) = args.discord_settings()?;
            let router = Arc::new(CommandRouter::new(Some(channel.clone())));
            // Create engine first, then attach the Discord adapter as a ResultSink.
            let core = Core::new(router, reg, pool, results_rx, None);
            let eng: Arc<dyn Engine> = core.clone();
            let a = Arc::new(discord::Adapter::new(client, channel, eng, args.poll_interval));
            core.set_sink(Some(a.clone()));
            if let Err(e) = a.announce() {
                tracing::warn!(error = %e, "failed to send introduction");
            }
            let res = a.run(&stop).context("discord adapter stopped");
            graceful_shutdown(args.shutdown_timeout, &core);
            res?;
        }
        _ => {
            let router = Arc::new(CommandRouter::new(None));
            let sink = Arc::new(cli::Sink::new(args.out_dir.clone()));
            let core = Core::new(router, reg, pool, results_rx, Some(sink));
            let eng: Arc<dyn Engine> = core.clone();
            let a = cli::Adapter::new(eng);
            let res = a.run(&stop).context("cli adapter stopped");
            graceful_shutdown(args.shutdown_timeout, &core);
            res?;
        }
    }
    Ok(())
}

/// Drains queued reports, giving up on waiting after `timeout`.
fn graceful_shutdown(timeout: Duration, core: &Arc<Core>) {
    let core = Arc::clone(core);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        core.shutdown();
        let _ = tx.send(());
    });
    if rx.recv_timeout(timeout).is_err() {
        tracing::warn!(?timeout, "shutdown timed out with reports still in flight");
    }
}
