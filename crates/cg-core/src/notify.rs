//! # Comment notifications
//!
//! Sinks handed to the service layer. Subscriptions are explicit per-post
//! channels owned by whoever holds the [`BroadcastSink`]; nothing is global.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

use crate::models::Comment;
use crate::traits::CommentSink;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CommentSink for NullSink {
    fn comment_added(&self, _comment: &Comment) {}
}

/// Fans new comments out to subscribers of their post.
pub struct BroadcastSink {
    channels: DashMap<String, broadcast::Sender<Comment>>,
    capacity: usize,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Receives every comment added to `post_id` from now on.
    pub fn subscribe(&self, post_id: &str) -> broadcast::Receiver<Comment> {
        self.channels
            .entry(post_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl CommentSink for BroadcastSink {
    fn comment_added(&self, comment: &Comment) {
        // The read guard must be released before `remove_if` locks the shard.
        let delivered = match self.channels.get(&comment.post_id) {
            Some(sender) => sender.send(comment.clone()).is_ok(),
            None => return,
        };

        // Err only means every receiver is gone; the channel goes with them.
        // A subscriber that raced in keeps it alive.
        if !delivered {
            self.channels
                .remove_if(&comment.post_id, |_, sender| sender.receiver_count() == 0);
            trace!(post_id = %comment.post_id, "no live subscribers, channel dropped");
        }
    }
}
