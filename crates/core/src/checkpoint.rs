//! Per-thread persistence of conversation state.
//!
//! A run is identified by a thread id. When the agent has a checkpointer,
//! each invocation starts from the conversation saved for its thread and
//! saves the result once the run is finished.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::conversation::Conversation;

/// A store of conversations keyed by thread id.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Returns the latest conversation saved for the thread.
    async fn load(&self, thread_id: &str) -> Option<Conversation>;

    /// Replaces the conversation saved for the thread.
    async fn save(&self, thread_id: &str, conversation: Conversation);
}

/// A checkpointer that keeps everything in memory for the lifetime of the
/// process.
#[derive(Debug, Default)]
pub struct MemorySaver {
    threads: Mutex<HashMap<String, Conversation>>,
}

impl MemorySaver {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn load(&self, thread_id: &str) -> Option<Conversation> {
        self.threads.lock().await.get(thread_id).cloned()
    }

    async fn save(&self, thread_id: &str, conversation: Conversation) {
        trace!("checkpoint {thread_id}: {} messages", conversation.len());
        self.threads
            .lock()
            .await
            .insert(thread_id.to_owned(), conversation);
    }
}
