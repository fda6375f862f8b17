use std::path::PathBuf;
use std::sync::Arc;

use crate::accumulator::Accumulator;
use crate::chart::{ChartRenderer, ChartRequest, MemberPalette};
use crate::error::TaskError;
use crate::narrative::{Narrative, NarrativeKind};
use crate::period::Period;
use crate::report::{ReportContext, TaskLine, compose, total_minutes};
use crate::sentences::SentenceCategory;
use crate::tasks::{Task, TaskContext, TaskOutput};
use crate::types::TaskInput;

pub const NAME: &str = "report";

/// Accumulates a parsed study report and builds the three-message summary.
pub struct ReportTask {
    totals: Arc<Accumulator>,
    narrative: Narrative,
    renderer: Arc<dyn ChartRenderer>,
    data_dir: PathBuf,
}

impl ReportTask {
    pub fn new(
        totals: Arc<Accumulator>,
        narrative: Narrative,
        renderer: Arc<dyn ChartRenderer>,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            totals,
            narrative,
            renderer,
            data_dir,
        }
    }
}

impl Task for ReportTask {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, input: &TaskInput) -> Result<(), TaskError> {
        match input {
            TaskInput::Report(entries) if !entries.is_empty() => Ok(()),
            TaskInput::Report(_) => Err(TaskError::InvalidInput { task: NAME }),
        }
    }

    fn run(&self, ctx: &TaskContext, input: TaskInput) -> Result<TaskOutput, TaskError> {
        let TaskInput::Report(entries) = input;

        self.totals.apply(&entries)?;
        // Read after applying; with several workers this may already include
        // a later command's minutes.
        let weekly = self.totals.snapshot()?.weekly;
        let total = total_minutes(&entries);

        let palette = MemberPalette::load(&self.data_dir);
        let request = ChartRequest::from_totals(&weekly, &palette, total);
        let chart = match self.renderer.render(&request) {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::error!(error = %e, "chart rendering failed, sending report without image");
                None
            }
        };

        let period = Period::current();
        let intro = self
            .narrative
            .write(NarrativeKind::Intro, &weekly, &ctx.channel_id);
        let closing = self
            .narrative
            .write(NarrativeKind::Closing, &weekly, &ctx.channel_id);

        let tasks: Vec<TaskLine> = entries
            .iter()
            .map(|e| {
                let category = if e.is_complete() {
                    SentenceCategory::TaskComplete
                } else {
                    SentenceCategory::TaskIncomplete
                };
                TaskLine::new(e, self.narrative.bank().pick_random(category))
            })
            .collect();

        tracing::info!(
            members = entries.len(),
            total_minutes = total,
            chart = chart.is_some(),
            "report composed"
        );

        let messages = compose(ReportContext {
            period,
            intro: &intro,
            closing: &closing,
            entries: &entries,
            tasks: &tasks,
            chart,
        });
        Ok(TaskOutput::Messages(messages.into()))
    }
}
