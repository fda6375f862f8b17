use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::RegistryError;
use crate::tasks::Task;

#[derive(Default)]
pub struct Registry {
    tasks: RwLock<HashMap<&'static str, Arc<dyn Task>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, t: Arc<dyn Task>) -> Result<(), RegistryError> {
        let name = t.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let mut g = self.tasks.write().map_err(|_| RegistryError::Poisoned)?;
        if g.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        g.insert(name, t);
        tracing::debug!(task = name, "task registered");
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Task>> {
        let g = self.tasks.read().ok()?;
        g.get(name).cloned()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use crate::error::TaskError;
    use crate::tasks::{Task, TaskContext, TaskOutput};
    use crate::types::{Outbound, TaskInput};

    /// Echoes each entry name back as one message; records the channel it ran for.
    #[derive(Default)]
    pub struct EchoTask {
        pub channels: Mutex<Vec<String>>,
    }

    impl Task for EchoTask {
        fn name(&self) -> &'static str {
            "report"
        }

        fn validate(&self, _input: &TaskInput) -> Result<(), TaskError> {
            Ok(())
        }

        fn run(&self, ctx: &TaskContext, input: TaskInput) -> Result<TaskOutput, TaskError> {
            self.channels.lock().unwrap().push(ctx.channel_id.clone());
            let TaskInput::Report(entries) = input;
            Ok(TaskOutput::Messages(
                entries.into_iter().map(|e| Outbound::text(e.name)).collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::EchoTask;
    use super::*;

    #[test]
    fn registers_and_looks_up_by_name() {
        let reg = Registry::new();
        reg.register(Arc::new(EchoTask::default())).unwrap();
        assert!(reg.lookup("report").is_some());
        assert!(reg.lookup("ask").is_none());
    }

    #[test]
    fn rejects_duplicates() {
        let reg = Registry::new();
        reg.register(Arc::new(EchoTask::default())).unwrap();
        assert_eq!(
            reg.register(Arc::new(EchoTask::default())),
            Err(RegistryError::Duplicate("report".to_string()))
        );
    }
}
