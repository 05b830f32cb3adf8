/// process handles, mailboxes and the messages that flow between them
///
use anyhow::{anyhow, Result};
use async_channel::{Receiver, Sender};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::event::{DomainEvent, StartProcessCommand};

/// the caller supplied id of a logical process
pub type ProcessId = Uuid;

// every process pair gets a unique handle number
static HANDLE_SEQ: AtomicU64 = AtomicU64::new(1);

/// a reply a worker may send back to whoever originated a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Started(ProcessId),
    Handled(ProcessId, String),
}

/// who sent a message. forwarding keeps the original origin, telling replaces it.
#[derive(Debug, Clone)]
pub enum Origin {
    Nobody,
    Manager,
    Caller(Sender<Reply>),
}

impl Origin {
    /// send a reply to the origin; origins without a reply channel swallow it
    pub fn reply(&self, reply: Reply) -> Result<()> {
        match self {
            Origin::Caller(tx) => tx
                .try_send(reply)
                .map_err(|e| anyhow!("could not reply to caller: {}", e)),
            Origin::Nobody | Origin::Manager => Ok(()),
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Origin::Manager)
    }
}

/// the messages a worker process receives
#[derive(Debug, Clone)]
pub enum ProcessMessage {
    Start(StartProcessCommand),
    Event(Arc<dyn DomainEvent>),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: ProcessMessage,
    pub origin: Origin,
}

impl Envelope {
    pub fn new(message: ProcessMessage, origin: Origin) -> Envelope {
        Envelope { message, origin }
    }
}

/// Opaque handle to a running worker process.
///
/// Two handles are equal when they refer to the same process.
#[derive(Clone)]
pub struct ProcessRef {
    handle: u64,
    mailbox: Sender<Envelope>,
    alive: Receiver<()>,
}

impl ProcessRef {
    /// the unique handle number of this process
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// pass a start command on, keeping the sender it arrived with
    pub fn forward(&self, command: StartProcessCommand, origin: Origin) -> Result<()> {
        self.deliver(Envelope::new(ProcessMessage::Start(command), origin))
    }

    /// send an event with the given origin as the sender
    pub fn tell(&self, event: Arc<dyn DomainEvent>, origin: Origin) -> Result<()> {
        self.deliver(Envelope::new(ProcessMessage::Event(event), origin))
    }

    fn deliver(&self, envelope: Envelope) -> Result<()> {
        self.mailbox
            .try_send(envelope)
            .map_err(|e| anyhow!("process {} mailbox rejected message: {}", self.handle, e))
    }

    /// ask the process to stop by closing its mailbox; the process exits once drained
    pub fn stop(&self) {
        self.mailbox.close();
    }

    /// true while the process side of this handle has not been dropped
    pub fn is_alive(&self) -> bool {
        !self.alive.is_closed()
    }

    /// resolves once the process has terminated
    pub async fn terminated(&self) {
        // nothing is ever sent on this channel, recv returns when the last sender drops
        let _ = self.alive.recv().await;
    }
}

impl PartialEq for ProcessRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for ProcessRef {}

impl Hash for ProcessRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for ProcessRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRef")
            .field("handle", &self.handle)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The process side of a handle: the inbox plus the liveness token.
///
/// Dropping the mailbox is what terminates the process as far as any watcher is concerned.
#[derive(Debug)]
pub struct Mailbox {
    handle: u64,
    inbox: Receiver<Envelope>,
    _alive: Sender<()>,
}

impl Mailbox {
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// wait for the next message; None once the mailbox is closed and drained
    pub async fn recv(&self) -> Option<Envelope> {
        self.inbox.recv().await.ok()
    }

    pub fn try_recv(&self) -> Option<Envelope> {
        self.inbox.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.inbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inbox.is_empty()
    }

    /// terminate the process
    pub fn stop(self) {
        self.inbox.close();
    }
}

/// create a connected handle/mailbox pair
pub fn channel() -> (ProcessRef, Mailbox) {
    let handle = HANDLE_SEQ.fetch_add(1, Ordering::Relaxed);
    let (mailbox, inbox) = async_channel::unbounded();
    let (alive_tx, alive_rx) = async_channel::bounded(1);

    let process = ProcessRef {
        handle,
        mailbox,
        alive: alive_rx,
    };

    let mbox = Mailbox {
        handle,
        inbox,
        _alive: alive_tx,
    };

    (process, mbox)
}
