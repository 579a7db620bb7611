//! # Exchange Sync Scheduler
//!
//! A concurrency-bounded, priority-ordered scheduler for exchange
//! synchronization jobs.
//!
//! Every connected exchange account periodically needs its trades, orders,
//! deposits and withdrawals pulled from the exchange. Exchanges enforce rate
//! limits shared by all users, so the scheduler caps how many sync jobs run at
//! once and parks everything else in three FIFO tiers (high, normal, low).
//! When a slot frees up, the head of the highest non-empty tier is dispatched.
//!
//! ## Key Features
//!
//! - **Bounded Concurrency**: `active <= max_concurrent` holds at every instant
//! - **Strict Priority**: high before normal before low, FIFO within a tier
//! - **Event-Driven Loop**: sleeps until a job arrives or a slot frees, exits when idle
//! - **Failure Isolation**: errors, panics and deadlines in a job never leak its slot
//! - **Deduplication**: one scheduled job per connection (reject, coalesce or allow)
//! - **Reports**: each finished job yields a `JobReport` delivered to an optional mailbox
//!
//! ```rust,ignore
//! use exchange_sync_scheduler::builders::build_scheduler;
//! use exchange_sync_scheduler::config::SchedulerConfig;
//! use exchange_sync_scheduler::core::JobSpec;
//! use exchange_sync_scheduler::runtime::TokioSpawner;
//! use exchange_sync_scheduler::util::serde::Priority;
//!
//! let cfg = SchedulerConfig::from_env()?;
//! let scheduler = build_scheduler(&cfg, my_exchange_client, TokioSpawner::try_current()?)?;
//!
//! scheduler.submit(
//!     JobSpec::full_sync("conn-42", "user-7", "binance").with_priority(Priority::High),
//! )?;
//!
//! let status = scheduler.status();
//! println!("pending={} active={}", status.pending(), status.active);
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions, job model and slot accounting.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for queues and mailboxes.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
