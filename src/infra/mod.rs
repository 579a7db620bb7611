//! Infrastructure adapters for queues and report mailboxes.

pub mod mailbox;
pub mod queue;
pub use mailbox::InMemoryMailbox;
pub use queue::TieredQueue;
