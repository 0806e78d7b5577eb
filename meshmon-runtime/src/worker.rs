//! Rule worker loop
//!
//! Drains the event queue one event at a time: every rule evaluation for an
//! event finishes before the next event is taken. On shutdown whatever is
//! still queued is discarded.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use meshmon_bot::{EventQueue, Recv, RuleEngine, QUEUE_POLL_INTERVAL};

use crate::shutdown_requested;

/// Why the worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Shutdown was signalled; carries the number of discarded events
    Shutdown { discarded: usize },
    /// Every event producer was dropped
    QueueClosed,
}

pub struct RuleWorker {
    engine: RuleEngine,
    queue: EventQueue,
    poll_interval: Duration,
}

impl RuleWorker {
    pub fn new(engine: RuleEngine, queue: EventQueue) -> Self {
        Self {
            engine,
            queue,
            poll_interval: QUEUE_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerExit {
        info!("Bot worker started");

        loop {
            let recv = tokio::select! {
                biased;
                stop = shutdown_requested(&mut shutdown) => {
                    if stop {
                        let discarded = self.queue.discard_pending();
                        info!("Bot worker stopping, discarded {} queued events", discarded);
                        return WorkerExit::Shutdown { discarded };
                    }
                    continue;
                }
                recv = self.queue.recv_timeout(self.poll_interval) => recv,
            };

            match recv {
                Recv::Event(event) => {
                    if let Err(e) = self.engine.evaluate(&event).await {
                        error!("Bot worker error: {}", e);
                    }
                }
                Recv::Idle => {}
                Recv::Closed => {
                    info!("Event queue closed, bot worker exiting");
                    return WorkerExit::QueueClosed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shutdown;
    use meshmon_bot::{event_queue, ActionDispatcher, RepeaterTransport};
    use meshmon_core::{Event, EventKind, NewBotRule, Trigger};
    use meshmon_store::Store;
    use serde_json::json;

    fn engine(store: &Store) -> RuleEngine {
        let transport = RepeaterTransport::shared("http://127.0.0.1:9").unwrap();
        RuleEngine::new(store.clone(), ActionDispatcher::new(transport).unwrap())
    }

    fn log_rule(store: &Store) -> i64 {
        store
            .session(|s| {
                s.create_rule(&NewBotRule::new(
                    "adverts",
                    &Trigger::PacketType("ADVERT".to_string()),
                    "log",
                ))
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_worker_processes_queued_events() {
        let store = Store::open_in_memory().unwrap();
        let rule_id = log_rule(&store);
        let (tx, rx) = event_queue();
        let shutdown = Shutdown::new();

        let worker = RuleWorker::new(engine(&store), rx).with_poll_interval(Duration::from_millis(20));
        let handle = tokio::spawn(worker.run(shutdown.subscribe()));

        for _ in 0..3 {
            tx.send(Event::new(EventKind::Packet, json!({"packet_type": "ADVERT"})));
        }
        tx.send(Event::neighbors_updated());

        let mut count = 0;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            count = store.session(|s| s.get_rule(rule_id)).unwrap().unwrap().trigger_count;
            if count == 3 {
                break;
            }
        }
        assert_eq!(count, 3);

        shutdown.trigger();
        let exit = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, WorkerExit::Shutdown { discarded: 0 });
    }

    #[tokio::test]
    async fn test_shutdown_discards_pending() {
        let store = Store::open_in_memory().unwrap();
        let rule_id = log_rule(&store);
        let (tx, rx) = event_queue();
        let shutdown = Shutdown::new();

        tx.send(Event::new(EventKind::Packet, json!({"packet_type": "ADVERT"})));
        tx.send(Event::new(EventKind::Packet, json!({"packet_type": "ADVERT"})));
        shutdown.trigger();

        let exit = RuleWorker::new(engine(&store), rx)
            .run(shutdown.subscribe())
            .await;
        assert_eq!(exit, WorkerExit::Shutdown { discarded: 2 });

        let rule = store.session(|s| s.get_rule(rule_id)).unwrap().unwrap();
        assert_eq!(rule.trigger_count, 0);
    }

    #[tokio::test]
    async fn test_worker_exits_when_producers_drop() {
        let store = Store::open_in_memory().unwrap();
        let (tx, rx) = event_queue();
        let shutdown = Shutdown::new();
        drop(tx);

        let exit = RuleWorker::new(engine(&store), rx)
            .with_poll_interval(Duration::from_millis(20))
            .run(shutdown.subscribe())
            .await;
        assert_eq!(exit, WorkerExit::QueueClosed);
    }
}
