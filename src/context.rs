/// the runtime side of a process: spawning behaviors and watching for termination
///
use async_channel::Sender;
use async_trait::async_trait;
use futures::FutureExt;
use hashbrown::HashSet;
use log::*;
use std::panic::AssertUnwindSafe;

use crate::event::Terminated;
use crate::manager::ManagerMessage;
use crate::process::{self, Envelope, Mailbox, ProcessRef};

/// How a process reacts to its own failures.
///
/// A failure is an `Err` returned from [`Process::receive`] or a panic inside it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// the process terminates on the first failure and is not restarted
    #[default]
    Stop,
    /// the failed message is dropped and the process keeps going
    Resume,
}

/// the behavior of a worker process
#[async_trait]
pub trait Process: Send + 'static {
    async fn receive(&mut self, envelope: Envelope) -> anyhow::Result<()>;
}

/// Spawning and watching capability handed to a process factory.
///
/// Owned by one manager; termination of every watched process is reported to that
/// manager's mailbox exactly once.
#[derive(Debug)]
pub struct ProcessContext {
    owner: String,
    notify: Sender<ManagerMessage>,
    watched: HashSet<u64>,
}

impl ProcessContext {
    pub(crate) fn new(owner: &str, notify: Sender<ManagerMessage>) -> ProcessContext {
        ProcessContext {
            owner: owner.to_string(),
            notify,
            watched: HashSet::new(),
        }
    }

    /// run the behavior on its own task and return its handle
    pub fn spawn<P: Process>(&self, behavior: P, policy: FailurePolicy) -> ProcessRef {
        let (process, mailbox) = process::channel();
        let owner = self.owner.clone();

        async_std::task::spawn(async move {
            let handle = mailbox.handle();
            match run(behavior, mailbox, policy).await {
                Ok(()) => debug!("process {} owned by {} exited", handle, owner),
                Err(e) => error!("process {} owned by {} stopped: {:?}", handle, owner, e),
            }
        });

        process
    }

    /// Register interest in the termination of a process.
    ///
    /// Returns false when the process is already watched, in which case no second
    /// notification is scheduled.
    pub fn watch(&mut self, process: &ProcessRef) -> bool {
        if !self.watched.insert(process.handle()) {
            return false;
        }

        let subject = process.clone();
        let notify = self.notify.clone();
        async_std::task::spawn(async move {
            subject.terminated().await;
            // the manager may already be gone, nobody is left to care
            let _ = notify.try_send(ManagerMessage::Terminated(Terminated { subject }));
        });

        true
    }

    /// forget a process once its termination has been handled
    pub fn unwatch(&mut self, process: &ProcessRef) -> bool {
        self.watched.remove(&process.handle())
    }

    pub fn is_watching(&self, process: &ProcessRef) -> bool {
        self.watched.contains(&process.handle())
    }
}

// the process loop; consumes the mailbox until it is closed or a failure stops it
async fn run<P: Process>(
    mut behavior: P,
    mailbox: Mailbox,
    policy: FailurePolicy,
) -> anyhow::Result<()> {
    while let Some(envelope) = mailbox.recv().await {
        let outcome = match AssertUnwindSafe(behavior.receive(envelope)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!("process panicked")),
        };

        if let Err(e) = outcome {
            match policy {
                FailurePolicy::Stop => return Err(e),
                FailurePolicy::Resume => {
                    warn!("process {} failed, resuming: {:?}", mailbox.handle(), e);
                }
            }
        }
    }

    Ok(())
}
