//! Persistence layer — libSQL-backed storage for saved messages.

pub mod libsql_backend;
pub mod migrations;
pub mod model;
pub mod traits;

pub use libsql_backend::LibSqlMessageStore;
pub use model::{MessageCategory, MessageFilter, MessageMetadata, PersistedMessageId, SavedMessage};
pub use traits::{MessageStore, ResultPersister};
