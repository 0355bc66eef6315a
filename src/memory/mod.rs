//! Agent Memory System
//!
//! Conversation log, bounded vector memory with similarity search, and the
//! decision pattern table, tied together by `MemoryManager`.

pub mod history;
pub mod index;
pub mod manager;
pub mod vector_store;

pub use history::ConversationLog;
pub use index::TermIndex;
pub use manager::{DecisionPatterns, EnhancedContext, MemoryManager};
pub use vector_store::VectorMemoryStore;
