//! shared helpers for the integration tests: a capturing logger, probe processes and events
#![allow(dead_code)]

use async_channel::{Receiver, Sender};
use log::kv::{Key, Source};
use log::{Level, LevelFilter, Log, Metadata, Record};
use process_manager::context::{FailurePolicy, ProcessContext};
use process_manager::process::{self, Envelope, Mailbox, ProcessId, ProcessRef};
use process_manager::{Config, DomainEvent, EventBus, ManagerRef, ProcessFactory, ProcessManager};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub level: Level,
    pub manager: String,
    pub message: String,
}

pub struct CaptureLogger {
    records: Mutex<Vec<Captured>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

static INIT: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        // only manager records carry the key
        let manager = match record.key_values().get(Key::from_str("manager")) {
            Some(value) => value.to_string(),
            None => return,
        };

        let captured = Captured {
            level: record.level(),
            manager,
            message: record.args().to_string(),
        };

        if let Ok(mut records) = self.records.lock() {
            records.push(captured);
        }
    }

    fn flush(&self) {}
}

pub fn init_logger() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Debug);
        }
    });
}

/// every record the named manager logged at info, warn or error, in order
pub fn logs(manager: &str) -> Vec<(Level, String)> {
    let records = LOGGER.records.lock().expect("log lock");
    records
        .iter()
        .filter(|r| r.manager == manager && r.level <= Level::Info)
        .map(|r| (r.level, r.message.clone()))
        .collect()
}

pub fn count(manager: &str, level: Level, message: &str) -> usize {
    logs(manager)
        .iter()
        .filter(|(l, m)| *l == level && m == message)
        .count()
}

/// poll the log until the record shows up
pub async fn wait_for_log(manager: &str, level: Level, message: &str) -> bool {
    for _ in 0..200 {
        if count(manager, level, message) > 0 {
            return true;
        }
        async_std::task::sleep(Duration::from_millis(10)).await;
    }

    false
}

/// Hands out a fresh probe process for every create call.
///
/// The probe's mailbox is sent to the test so it can inspect what the manager delivered.
pub struct ProbeFactory {
    probes: Sender<Mailbox>,
    created: AtomicUsize,
    policies: Mutex<Vec<FailurePolicy>>,
}

impl ProbeFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn policies(&self) -> Vec<FailurePolicy> {
        self.policies.lock().expect("policy lock").clone()
    }
}

impl ProcessFactory for ProbeFactory {
    fn create(&self, _context: &ProcessContext, policy: FailurePolicy) -> ProcessRef {
        let (process, mailbox) = process::channel();
        self.created.fetch_add(1, Ordering::SeqCst);
        self.policies.lock().expect("policy lock").push(policy);
        self.probes.try_send(mailbox).expect("probe channel open");
        process
    }
}

pub struct Harness {
    pub name: String,
    pub manager: ManagerRef,
    pub bus: EventBus,
    pub factory: Arc<ProbeFactory>,
    pub probes: Receiver<Mailbox>,
}

impl Harness {
    /// a manager with a unique name so its log records can be picked out
    pub fn new() -> Harness {
        init_logger();

        let name = format!("manager-{}", uuid::Uuid::new_v4());
        let (tx, probes) = async_channel::unbounded();
        let factory = Arc::new(ProbeFactory {
            probes: tx,
            created: AtomicUsize::new(0),
            policies: Mutex::new(vec![]),
        });

        let bus = EventBus::new();
        let config = Config::default().with_name(&name);
        let manager = ProcessManager::spawn(&config, factory.clone(), &bus);

        Harness {
            name,
            manager,
            bus,
            factory,
            probes,
        }
    }

    /// wait for the next probe the factory created
    pub async fn next_probe(&self) -> Mailbox {
        async_std::future::timeout(Duration::from_secs(2), self.probes.recv())
            .await
            .expect("factory should create a probe")
            .expect("probe channel open")
    }

    /// round trip through the manager so everything sent before has been handled
    pub async fn sync(&self) -> Vec<ProcessId> {
        self.manager.process_ids().await.expect("manager running")
    }

    pub fn logs(&self) -> Vec<(Level, String)> {
        logs(&self.name)
    }

    pub fn count(&self, level: Level, message: &str) -> usize {
        count(&self.name, level, message)
    }

    pub async fn wait_for_log(&self, level: Level, message: &str) -> bool {
        wait_for_log(&self.name, level, message).await
    }
}

pub async fn expect_msg(mailbox: &Mailbox) -> Envelope {
    async_std::future::timeout(Duration::from_secs(2), mailbox.recv())
        .await
        .expect("probe should receive a message")
        .expect("probe mailbox open")
}

#[derive(Debug, Clone)]
pub struct AccountOpened {
    pub id: ProcessId,
}

impl DomainEvent for AccountOpened {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct FundsDeposited {
    pub id: ProcessId,
    pub amount: u64,
}

impl DomainEvent for FundsDeposited {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
