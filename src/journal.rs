/// A worker that journals the events delegated to it.
///
/// Each journal owns one process id. It replies `Started` to whoever sent the start
/// command, then appends every event for its id to a shared sink. A closed sink or an
/// event for a foreign id is a failure, which under the manager's stop policy ends the
/// process.
///
use anyhow::{anyhow, bail, Result};
use async_channel::Sender;
use async_trait::async_trait;
use log::*;

use crate::context::{FailurePolicy, Process, ProcessContext};
use crate::factory::ProcessFactory;
use crate::process::{Envelope, ProcessId, ProcessMessage, ProcessRef, Reply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: ProcessId,
    pub event: String,
    pub from_manager: bool,
}

#[derive(Debug)]
pub struct Journal {
    id: Option<ProcessId>,
    sink: Sender<JournalEntry>,
    count: u64,
}

impl Journal {
    pub fn new(sink: Sender<JournalEntry>) -> Journal {
        Journal {
            id: None,
            sink,
            count: 0,
        }
    }
}

#[async_trait]
impl Process for Journal {
    async fn receive(&mut self, envelope: Envelope) -> Result<()> {
        match envelope.message {
            ProcessMessage::Start(cmd) => {
                info!("journal started for id: {}", cmd.id);
                self.id = Some(cmd.id);
                envelope.origin.reply(Reply::Started(cmd.id))?;
            }
            ProcessMessage::Event(event) => {
                if self.id != Some(event.id()) {
                    bail!("journal {:?} got an event for {}", self.id, event.id());
                }

                let entry = JournalEntry {
                    id: event.id(),
                    event: event.name().to_string(),
                    from_manager: envelope.origin.is_manager(),
                };

                self.sink
                    .send(entry)
                    .await
                    .map_err(|e| anyhow!("journal sink closed: {}", e))?;

                self.count += 1;
                debug!("journal {} entry count: {}", event.id(), self.count);
                envelope
                    .origin
                    .reply(Reply::Handled(event.id(), event.name().to_string()))?;
            }
        }

        Ok(())
    }
}

/// creates a new journal process for every id the manager starts
#[derive(Debug, Clone)]
pub struct JournalFactory {
    sink: Sender<JournalEntry>,
}

impl JournalFactory {
    pub fn new(sink: Sender<JournalEntry>) -> JournalFactory {
        JournalFactory { sink }
    }
}

impl ProcessFactory for JournalFactory {
    fn create(&self, context: &ProcessContext, policy: FailurePolicy) -> ProcessRef {
        context.spawn(Journal::new(self.sink.clone()), policy)
    }
}
