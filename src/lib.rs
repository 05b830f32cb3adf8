#![doc = include_str!("../README.md")]

pub mod config;
pub mod context;
pub mod event;
pub mod event_stream;
pub mod factory;
pub mod journal;
pub mod logging;
pub mod manager;
pub mod process;
pub mod status;

pub use config::Config;
pub use context::{FailurePolicy, Process, ProcessContext};
pub use event::{DomainEvent, StartProcessCommand, Terminated};
pub use event_stream::{EventBus, EventStream, Subscriber};
pub use factory::ProcessFactory;
pub use manager::{ManagerRef, ProcessManager};
pub use process::{Envelope, Mailbox, Origin, ProcessId, ProcessMessage, ProcessRef, Reply};

/// the current app version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
