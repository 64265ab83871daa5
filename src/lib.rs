//! # tarn
//!
//! A thread-safe, scope-aware object pool: check out expensive-to-construct
//! resources (database connections, parsers, big buffers), use them through a
//! scoped closure, and let the pool reuse them under a capacity bound.
//!
//! ## Features
//!
//! - Blocking checkout with a per-pool deadline and timeout errors
//! - Lazy construction outside the pool lock, or eager pre-population
//! - FIFO (round-robin) or LIFO (warm-reuse) idle-resource policies
//! - Re-entrant checkout: nested checkouts on one thread share the resource
//! - Scopes: one thread can hold independent resources per named scope
//! - Detach hook plus a per-checkout override to drop a resource from reuse
//! - Runtime resize with immediate idle eviction and lazy drain
//! - Guaranteed checkin on every exit path, panics included
//!
//! ## Quick start
//!
//! ```rust
//! use tarn::{Pool, PoolConfig};
//!
//! let pool = Pool::from_fn(PoolConfig::new().with_maximum_size(4), || {
//!     // stands in for opening a connection
//!     String::from("resource")
//! }).unwrap();
//!
//! let n = pool.checkout(|res| res.len()).unwrap();
//! assert_eq!(n, 8);
//! // The resource is back in the pool for the next caller.
//! assert_eq!(pool.available_count(), 1);
//! ```

mod config;
mod errors;
mod pool;
mod scope;
mod stats;
mod wrapper;

pub use config::{CollectionPolicy, PoolConfig};
pub use errors::{ConstructionError, PoolError, PoolResult};
pub use pool::Pool;
pub use scope::Scope;
pub use stats::PoolStats;
pub use wrapper::PoolWrapper;
