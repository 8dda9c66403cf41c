//! Persistence traits for generated messages.

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::generation::types::GenerationResult;

use super::model::{MessageFilter, MessageMetadata, PersistedMessageId, SavedMessage};

/// Write side: store an accepted generation result.
#[async_trait]
pub trait ResultPersister: Send + Sync {
    /// Save `result` for `user_id`. The store assigns the id and `createdAt`.
    async fn save(
        &self,
        user_id: &str,
        result: &GenerationResult,
        metadata: &MessageMetadata,
    ) -> Result<PersistedMessageId, PersistenceError>;
}

/// Read side over saved messages, scoped per user.
#[async_trait]
pub trait MessageStore: ResultPersister {
    /// Get a single saved message owned by `user_id`.
    async fn get_message(
        &self,
        user_id: &str,
        id: &PersistedMessageId,
    ) -> Result<Option<SavedMessage>, PersistenceError>;

    /// List saved messages for `user_id`, newest first.
    async fn list_messages(
        &self,
        user_id: &str,
        filter: &MessageFilter,
    ) -> Result<Vec<SavedMessage>, PersistenceError>;
}
