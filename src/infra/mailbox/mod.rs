//! Report mailbox backends.

pub mod memory;

pub use memory::InMemoryMailbox;
