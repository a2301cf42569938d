#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe pool of reusable resources that adapts its size to demand.
//!
//! This crate provides [`AdaptivePool`], a pool with a fixed number of slots that hands out
//! resources such as connections, buffers or engine handles and reclaims them afterwards. Under
//! low demand the pool tears down idle resources to shrink; under high demand it recreates them
//! to regrow. When and how this happens is decided by a caller-supplied policy set.
//!
//! # Key features
//!
//! - **Fixed slot table**: The initializer decides the number of slots once; only the state of
//!   a slot (idle, busy or released) changes afterwards.
//! - **Pluggable policies**: Implement [`ResourcePolicy`] or configure closures via
//!   [`AdaptivePool::builder()`] to control initialization, shrinking, regrowing and teardown.
//! - **Never blocks on exhaustion**: [`AdaptivePool::acquire()`] returns `None` immediately
//!   when it cannot hand out a resource. There is no waiting or fairness between callers.
//! - **Never empties itself**: Shrinking stops at a minimum number of active slots (one by
//!   default), so serving requests never tears down the whole pool.
//! - **Leases**: Acquired resources are exclusive [`Lease`]s that go back to the pool when
//!   released or dropped.
//!
//! # Policy constraints
//!
//! Policies run while the pool's lock is held. They must return promptly, must not block and
//! must not call back into the pool. A panicking policy propagates the panic to the caller of
//! the pool operation; the pool itself remains usable and its bookkeeping consistent.
//!
//! # Logging
//!
//! Pool events are emitted as `tracing` events. A caller-supplied logger receives a
//! human-readable message for the same events.
//!
//! # Example
//!
//! ```rust
//! use adaptive_pool::AdaptivePool;
//!
//! // Four buffers; shrink to two under low demand, regrow when fewer than two are active.
//! let pool = AdaptivePool::builder()
//!     .initializer(|| vec![Vec::<u8>::with_capacity(4096); 4])
//!     .should_release(|active| active > 2)
//!     .can_restore(|active| active < 2)
//!     .restore(|_index| Some(Vec::with_capacity(4096)))
//!     .release(|buffer| buffer.clear())
//!     .build()
//!     .unwrap();
//!
//! // Low demand: the first two requests shrink the pool instead of being served.
//! assert!(pool.acquire().is_none());
//! assert!(pool.acquire().is_none());
//! assert_eq!(pool.active_count(), 2);
//!
//! // The remaining buffers are handed out normally.
//! let mut buffer = pool.acquire().unwrap();
//! buffer.extend_from_slice(b"payload");
//! pool.release(buffer);
//!
//! assert_eq!(pool.idle_count(), 2);
//! ```

mod builder;
mod error;
mod lease;
mod policy;
mod pool;
mod slot;

pub use builder::*;
pub use error::*;
pub use lease::*;
#[cfg(test)]
pub(crate) use policy::MockResourcePolicy;
pub use policy::{BoxedError, ResourcePolicy};
pub(crate) use pool::PoolInner;
pub use pool::AdaptivePool;
pub use slot::SlotState;
pub(crate) use slot::SlotTable;
