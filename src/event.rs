/// commands, domain events and lifecycle notifications understood by the manager
///
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

use crate::process::{ProcessId, ProcessRef};

/// ask the manager to create the process for an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartProcessCommand {
    pub id: ProcessId,
}

impl StartProcessCommand {
    pub fn new(id: ProcessId) -> StartProcessCommand {
        StartProcessCommand { id }
    }
}

/// Any message addressed to the process that owns `id()`.
///
/// The manager routes on the id alone; the payload only matters to the worker.
/// Two events compare equal when they carry the same id and are the same concrete type.
pub trait DomainEvent: Debug + Send + Sync + 'static {
    fn id(&self) -> ProcessId;

    fn as_any(&self) -> &dyn Any;

    /// short name of the concrete event type, used in worker logs
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

impl PartialEq for dyn DomainEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.as_any().type_id() == other.as_any().type_id()
    }
}

/// delivered to a watcher when a process it watches has exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminated {
    pub subject: ProcessRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Debug)]
    struct Opened {
        id: ProcessId,
    }

    impl DomainEvent for Opened {
        fn id(&self) -> ProcessId {
            self.id
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Closed {
        id: ProcessId,
    }

    impl DomainEvent for Closed {
        fn id(&self) -> ProcessId {
            self.id
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn equality_is_id_and_type() {
        let id = Uuid::new_v4();
        let a: Arc<dyn DomainEvent> = Arc::new(Opened { id });
        let b: Arc<dyn DomainEvent> = Arc::new(Opened { id });
        let c: Arc<dyn DomainEvent> = Arc::new(Closed { id });
        let d: Arc<dyn DomainEvent> = Arc::new(Opened { id: Uuid::new_v4() });

        assert!(*a == *b);
        assert!(*a != *c);
        assert!(*a != *d);
    }

    #[test]
    fn name() {
        let event = Opened { id: Uuid::nil() };
        assert_eq!(event.name(), "Opened");
    }

    #[test]
    fn start_command_json() {
        let cmd = StartProcessCommand::new(Uuid::new_v4());
        let js = serde_json::to_string(&cmd).unwrap();
        let back: StartProcessCommand = serde_json::from_str(&js).unwrap();
        assert_eq!(back, cmd);
    }
}
