use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::debug;

use crate::node::CategoryNode;

/// Shared, immutable top-level sequence handed to every subscriber.
pub type TreeSnapshot = Arc<Vec<CategoryNode>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Callback(Box<dyn FnMut(&TreeSnapshot)>),
    Channel(Sender<TreeSnapshot>),
}

/// Holder of the current tree value. Each publish reaches every subscriber,
/// in subscription order, before `publish` returns; a new subscriber is
/// handed the current value right away.
pub struct TreeChannel {
    current: TreeSnapshot,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    version: u64,
}

impl fmt::Debug for TreeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeChannel")
            .field("top_level", &self.current.len())
            .field("subscribers", &self.subscribers.len())
            .field("version", &self.version)
            .finish()
    }
}

impl Default for TreeChannel {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TreeChannel {
    pub fn new(initial: Vec<CategoryNode>) -> Self {
        Self {
            current: Arc::new(initial),
            subscribers: Vec::new(),
            next_subscription: 0,
            version: 0,
        }
    }

    pub fn current(&self) -> TreeSnapshot {
        Arc::clone(&self.current)
    }

    /// Number of values published since construction.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn publish(&mut self, tree: Vec<CategoryNode>) {
        self.current = Arc::new(tree);
        self.version += 1;

        let snapshot = &self.current;
        self.subscribers.retain_mut(|(id, subscriber)| match subscriber {
            Subscriber::Callback(callback) => {
                callback(snapshot);
                true
            }
            Subscriber::Channel(sender) => {
                let delivered = sender.send(Arc::clone(snapshot)).is_ok();
                if !delivered {
                    debug!(?id, "dropping disconnected tree subscriber");
                }
                delivered
            }
        });
        debug!(version = self.version, subscribers = self.subscribers.len(), "published tree");
    }

    fn allocate(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        id
    }

    pub fn subscribe(
        &mut self,
        mut callback: impl FnMut(&TreeSnapshot) + 'static,
    ) -> SubscriptionId {
        callback(&self.current);
        let id = self.allocate();
        self.subscribers.push((id, Subscriber::Callback(Box::new(callback))));
        id
    }

    /// Subscribe through an mpsc channel so another thread can follow the
    /// tree. The receiver already holds the current value.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<TreeSnapshot>) {
        let (tx, rx) = mpsc::channel();
        // The receiver is alive here, so the send cannot fail.
        let _ = tx.send(Arc::clone(&self.current));
        let id = self.allocate();
        self.subscribers.push((id, Subscriber::Channel(tx)));
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn clear_subscribers(&mut self) {
        self.subscribers.clear();
    }
}
