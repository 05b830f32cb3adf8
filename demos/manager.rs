/// run a manager with journal workers and push a few events through it
///
/// cargo run --example manager [config.json]
///
use anyhow::Result;
use log::*;
use process_manager::journal::JournalFactory;
use process_manager::{
    logging, Config, DomainEvent, EventBus, ProcessId, ProcessManager, StartProcessCommand,
};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
struct OrderPlaced {
    id: ProcessId,
    sku: String,
}

impl DomainEvent for OrderPlaced {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct OrderShipped {
    id: ProcessId,
}

impl DomainEvent for OrderShipped {
    fn id(&self) -> ProcessId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_std::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    logging::init(&config)?;

    info!("process manager version: {}", process_manager::VERSION);

    let (sink, entries) = async_channel::unbounded();
    let bus = EventBus::new();
    let manager = ProcessManager::spawn(&config, Arc::new(JournalFactory::new(sink)), &bus);

    let orders: Vec<ProcessId> = (0..3).map(|_| Uuid::new_v4()).collect();
    for id in orders.iter() {
        manager.start(StartProcessCommand::new(*id))?;
    }

    // a duplicate start and an event nobody owns, both only show up in the log
    manager.start(StartProcessCommand::new(orders[0]))?;
    manager.tell(Arc::new(OrderShipped { id: Uuid::new_v4() }))?;

    for (n, id) in orders.iter().enumerate() {
        let order = OrderPlaced {
            id: *id,
            sku: format!("sku-{}", n),
        };
        info!("placing order {} for {}", order.id, order.sku);
        manager.tell(Arc::new(order))?;
        bus.publish(Arc::new(OrderShipped { id: *id }));
    }

    for _ in 0..orders.len() * 2 {
        let entry = entries.recv().await?;
        info!("journal: {} {}", entry.id, entry.event);
    }

    info!("status: {}", manager.status().await?.to_json());
    let status = manager.shutdown().await?;
    info!("stopped with {} process(es)", status.process_count);

    Ok(())
}
