//! Subscription registry
//!
//! Allocates process-unique subscription identifiers and tracks which
//! are open, so a session reset can cancel everything in bulk. An id
//! carries a human-readable prefix (the query's kinds) for log
//! readability; uniqueness comes from the uuid component. Ids are never
//! reused once closed.

use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use crate::pool::Transport;
use crate::protocol::{ClientMessage, Filter};

pub struct SubscriptionRegistry {
    active: HashSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            active: HashSet::new(),
        }
    }

    /// Allocate an id for the query and record it as active. The caller
    /// broadcasts the REQ itself.
    pub fn open(&mut self, filter: &Filter) -> String {
        let prefix = filter
            .kinds
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("-");
        let entropy = Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", prefix, &entropy[..12]);

        self.active.insert(id.clone());
        debug!("Opened subscription {}", id);
        id
    }

    /// Whether an id is currently open. Events arriving on a closed
    /// subscription belong to a previous session and must not be applied.
    pub fn is_active(&self, sub_id: &str) -> bool {
        self.active.contains(sub_id)
    }

    /// Broadcast a CLOSE for every active subscription, then clear the
    /// set. Fire-and-forget: relays are not required to acknowledge.
    /// A no-op when nothing is open.
    pub async fn close_all<T: Transport>(&mut self, transport: &T) {
        for sub_id in self.active.drain() {
            debug!("Closing subscription {}", sub_id);
            transport.broadcast(&ClientMessage::Close { sub_id }).await;
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
