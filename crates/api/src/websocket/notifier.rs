//! Best-effort notification delivery to a single agent

use omnicanal_shared::{AgentId, Notification};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::registry::ConnectionRegistry;

/// Result of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queued on the agent's open connection
    Delivered,
    /// The agent has no open connection
    Missed,
    /// The agent has a connection but the frame could not be queued
    Failed,
}

/// Delivery counters
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    missed: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryStats {
    fn record(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Delivered => &self.delivered,
            DeliveryOutcome::Missed => &self.missed,
            DeliveryOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DeliveryStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct DeliverySnapshot {
    pub delivered: u64,
    pub missed: u64,
    pub failed: u64,
}

/// Pushes notifications to agents with an open connection
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<DeliveryStats>,
}

impl Notifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    /// Push a notification to an agent.
    ///
    /// Never fails and never waits on the socket: the frame is queued on the
    /// connection and written by its writer task. Callers are free to ignore
    /// the outcome.
    pub async fn notify(&self, agent_id: &AgentId, notification: &Notification) -> DeliveryOutcome {
        let outcome = match self.registry.lookup(agent_id).await {
            Some(conn) => match conn.send(notification) {
                Ok(()) => {
                    tracing::debug!(
                        agent_id = %agent_id,
                        session_id = %conn.session_id,
                        kind = ?notification.kind,
                        "Notification delivered"
                    );
                    DeliveryOutcome::Delivered
                }
                Err(e) => {
                    tracing::warn!(
                        agent_id = %agent_id,
                        session_id = %conn.session_id,
                        kind = ?notification.kind,
                        error = %e,
                        "Notification delivery failed"
                    );
                    DeliveryOutcome::Failed
                }
            },
            None => {
                tracing::info!(
                    agent_id = %agent_id,
                    kind = ?notification.kind,
                    "Agent not connected, notification not delivered"
                );
                DeliveryOutcome::Missed
            }
        };

        self.stats.record(outcome);
        outcome
    }

    pub fn stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }
}
