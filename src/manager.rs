/// The process manager: one worker process per id.
///
/// The manager runs on its own task and handles its mailbox one message at a time, so the
/// registry is never shared or locked. It creates a process on a start command, routes domain
/// events to the process registered for the event's id, and drops the registration when the
/// runtime reports that the process terminated.
///
/// Every transition is logged with the `manager` key set to the manager's name.
///
use anyhow::{anyhow, Context, Result};
use async_channel::{Receiver, Sender};
use hashbrown::HashMap;
use log::*;
use service_uptime::Uptime;
use std::sync::Arc;

use crate::config::Config;
use crate::context::{FailurePolicy, ProcessContext};
use crate::event::{DomainEvent, StartProcessCommand, Terminated};
use crate::event_stream::{EventStream, Subscriber};
use crate::factory::ProcessFactory;
use crate::process::{Origin, ProcessId, ProcessRef, Reply};
use crate::status::{ManagerState, ManagerStatus, DOWN, OK};

/// the manager's mailbox protocol
#[derive(Debug)]
pub enum ManagerMessage {
    Start(StartProcessCommand, Origin),
    Event(Arc<dyn DomainEvent>),
    Terminated(Terminated),
    ProcessIds(Sender<Vec<ProcessId>>),
    Status(Sender<ManagerStatus>),
    Shutdown(Sender<ManagerStatus>),
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct ProcessManager {
    name: String,
    factory: Arc<dyn ProcessFactory>,
    context: ProcessContext,
    processes: HashMap<ProcessId, ProcessRef>,
    mailbox: Sender<ManagerMessage>,
    uptime: Uptime,
}

impl ProcessManager {
    fn new(
        name: &str,
        factory: Arc<dyn ProcessFactory>,
        mailbox: Sender<ManagerMessage>,
    ) -> ProcessManager {
        ProcessManager {
            name: name.to_string(),
            factory,
            context: ProcessContext::new(name, mailbox.clone()),
            processes: HashMap::new(),
            mailbox,
            uptime: Uptime::new(),
        }
    }

    /// Start a manager on its own task.
    ///
    /// The manager subscribes to `events` before it handles its first message, so every
    /// domain event published from here on reaches it.
    pub fn spawn(
        config: &Config,
        factory: Arc<dyn ProcessFactory>,
        events: &dyn EventStream,
    ) -> ManagerRef {
        let (tx, rx) = async_channel::unbounded();
        let manager = ProcessManager::new(&config.name, factory, tx.clone());

        let manager_ref = ManagerRef {
            name: config.name.clone(),
            tx,
        };

        events.subscribe(Arc::new(manager_ref.clone()));

        async_std::task::spawn(manager.run(rx));

        manager_ref
    }

    async fn run(mut self, rx: Receiver<ManagerMessage>) {
        info!(manager = self.name.as_str(); "manager {} ready", self.name);

        while let Ok(message) = rx.recv().await {
            debug!(manager = self.name.as_str(); "recv: {:?}", message);
            if self.handle(message) == Flow::Stop {
                break;
            }
        }

        rx.close();
    }

    fn handle(&mut self, message: ManagerMessage) -> Flow {
        match message {
            ManagerMessage::Start(command, origin) => self.start_process(command, origin),
            ManagerMessage::Event(event) => self.delegate(event),
            ManagerMessage::Terminated(terminated) => self.remove_process(terminated),
            ManagerMessage::ProcessIds(tx) => {
                if tx.try_send(self.process_ids()).is_err() {
                    warn!(manager = self.name.as_str(); "error returning process ids");
                }
            }
            ManagerMessage::Status(tx) => {
                if tx.try_send(self.status(ManagerState::Ready)).is_err() {
                    warn!(manager = self.name.as_str(); "error returning status");
                }
            }
            ManagerMessage::Shutdown(tx) => {
                let status = self.shutdown();
                if tx.try_send(status).is_err() {
                    warn!(manager = self.name.as_str(); "error acknowledging shutdown");
                }
                return Flow::Stop;
            }
        }

        Flow::Continue
    }

    fn start_process(&mut self, command: StartProcessCommand, origin: Origin) {
        let id = command.id;
        info!(manager = self.name.as_str(); "Creating process with Id: {}.", id);

        if self.processes.contains_key(&id) {
            error!(manager = self.name.as_str(); "Process exists with Id: {}.", id);
            return;
        }

        let process = self.factory.create(&self.context, FailurePolicy::Stop);

        // one process per id, one id per process
        if let Some(owner) = self.lookup(&process) {
            error!(
                manager = self.name.as_str();
                "Factory returned the process already registered with Id: {}.", owner
            );
            return;
        }

        self.context.watch(&process);
        self.processes.insert(id, process.clone());
        info!(manager = self.name.as_str(); "Created process with Id: {}.", id);

        if let Err(e) = process.forward(command, origin) {
            warn!(manager = self.name.as_str(); "{}", e);
        }
    }

    fn delegate(&mut self, event: Arc<dyn DomainEvent>) {
        let id = event.id();

        let process = match self.processes.get(&id) {
            Some(process) => process,
            None => {
                error!(
                    manager = self.name.as_str();
                    "Could not delegate event to process with Id: {}.", id
                );
                return;
            }
        };

        info!(manager = self.name.as_str(); "Delegating event to process with Id: {}.", id);
        if let Err(e) = process.tell(event, Origin::Manager) {
            // terminated but not reaped yet; the termination notice is on its way
            warn!(manager = self.name.as_str(); "{}", e);
        }
    }

    fn remove_process(&mut self, terminated: Terminated) {
        info!(manager = self.name.as_str(); "Removing process.");
        self.context.unwatch(&terminated.subject);

        match self.lookup(&terminated.subject) {
            Some(id) => {
                info!(manager = self.name.as_str(); "Removing process with Id: {}.", id);
                self.processes.remove(&id);
            }
            None => {
                warn!(manager = self.name.as_str(); "Could not remove process.");
            }
        }
    }

    // reverse lookup, linear in the number of processes
    fn lookup(&self, process: &ProcessRef) -> Option<ProcessId> {
        self.processes
            .iter()
            .find(|(_, registered)| *registered == process)
            .map(|(id, _)| *id)
    }

    fn shutdown(&mut self) -> ManagerStatus {
        info!(
            manager = self.name.as_str();
            "manager {} stopping {} process(es)", self.name, self.processes.len()
        );

        // refuse anything sent after the shutdown request
        self.mailbox.close();

        for process in self.processes.values() {
            process.stop();
        }

        let status = self.status(ManagerState::Stopped);
        self.processes.clear();
        info!(manager = self.name.as_str(); "final status: {}", status.to_json());

        status
    }

    /// the ids of all registered processes, sorted
    pub fn process_ids(&self) -> Vec<ProcessId> {
        let mut ids: Vec<ProcessId> = self.processes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[cfg(test)]
    fn contains(&self, id: &ProcessId) -> bool {
        self.processes.contains_key(id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.processes.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    fn status(&self, state: ManagerState) -> ManagerStatus {
        let status = match state {
            ManagerState::Ready => OK,
            ManagerState::Stopped => DOWN,
        };

        ManagerStatus::new(
            self.name.clone(),
            status.to_string(),
            state,
            self.uptime.to_string(),
            self.processes.len(),
        )
    }
}

/// Address of a running manager.
///
/// Sends never block and carry no acknowledgement; the manager reports what it did
/// through its logs. Only the queries wait for an answer.
#[derive(Debug, Clone)]
pub struct ManagerRef {
    name: String,
    tx: Sender<ManagerMessage>,
}

impl ManagerRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// start the process for the command's id; the process sees no sender
    pub fn start(&self, command: StartProcessCommand) -> Result<()> {
        self.send(ManagerMessage::Start(command, Origin::Nobody))
    }

    /// start the process for the command's id; the process may reply on `reply_to`
    pub fn start_with_reply(
        &self,
        command: StartProcessCommand,
        reply_to: Sender<Reply>,
    ) -> Result<()> {
        self.send(ManagerMessage::Start(command, Origin::Caller(reply_to)))
    }

    /// send a domain event directly to the manager
    pub fn tell(&self, event: Arc<dyn DomainEvent>) -> Result<()> {
        self.send(ManagerMessage::Event(event))
    }

    pub async fn process_ids(&self) -> Result<Vec<ProcessId>> {
        let (tx, rx) = async_channel::bounded(1);
        self.send(ManagerMessage::ProcessIds(tx))?;
        rx.recv()
            .await
            .with_context(|| format!("manager {} did not return process ids", self.name))
    }

    pub async fn contains(&self, id: &ProcessId) -> Result<bool> {
        Ok(self.process_ids().await?.contains(id))
    }

    pub async fn status(&self) -> Result<ManagerStatus> {
        let (tx, rx) = async_channel::bounded(1);
        self.send(ManagerMessage::Status(tx))?;
        rx.recv()
            .await
            .with_context(|| format!("manager {} did not return status", self.name))
    }

    /// stop the manager and every process it owns; returns the final status
    ///
    /// This is the only way to tear a manager down. The manager and the event bus keep senders
    /// to its mailbox, so dropping every `ManagerRef` leaves the manager and its processes running.
    pub async fn shutdown(&self) -> Result<ManagerStatus> {
        let (tx, rx) = async_channel::bounded(1);
        self.send(ManagerMessage::Shutdown(tx))?;
        rx.recv()
            .await
            .with_context(|| format!("manager {} did not acknowledge shutdown", self.name))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, message: ManagerMessage) -> Result<()> {
        self.tx
            .try_send(message)
            .map_err(|e| anyhow!("manager {} is not running: {}", self.name, e))
    }
}

impl Subscriber for ManagerRef {
    fn notify(&self, event: Arc<dyn DomainEvent>) -> bool {
        self.tx.try_send(ManagerMessage::Event(event)).is_ok()
    }

    fn name(&self) -> String {
        format!("manager {}", self.name)
    }
}
