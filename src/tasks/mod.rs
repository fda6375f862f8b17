pub mod report;

use crate::error::TaskError;
use crate::types::{Outbound, TaskInput};

pub use report::ReportTask;

#[derive(Clone, Debug)]
pub enum TaskOutput {
    Messages(Vec<Outbound>),
}

/// Per-job facts a task may need beyond its input.
#[derive(Clone, Debug, Default)]
pub struct TaskContext {
    pub channel_id: String,
}

pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &TaskInput) -> Result<(), TaskError>;
    fn run(&self, ctx: &TaskContext, input: TaskInput) -> Result<TaskOutput, TaskError>;
}
