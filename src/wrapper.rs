//! Delegating wrapper over a pool

use crate::config::PoolConfig;
use crate::errors::{ConstructionError, PoolResult};
use crate::pool::Pool;

/// Convenience wrapper that runs each operation against a freshly
/// checked-out resource from the default scope.
///
/// Because checkout is re-entrant, a [`call`](PoolWrapper::call) made from
/// inside another `call` on the same thread runs against the same resource,
/// which is how multi-step sequences ("pipelines") are expressed:
///
/// ```
/// use tarn::{PoolConfig, PoolWrapper};
///
/// let wrapper = PoolWrapper::from_fn(PoolConfig::new(), || String::from("conn")).unwrap();
///
/// // One checkout per call...
/// let len = wrapper.call(|conn| conn.len()).unwrap();
/// assert_eq!(len, 4);
///
/// // ...or several calls pinned to one resource.
/// wrapper.call(|conn| {
///     let first = conn.as_ptr();
///     let second = wrapper.call(|conn| conn.as_ptr()).unwrap();
///     assert_eq!(first, second);
/// }).unwrap();
/// ```
pub struct PoolWrapper<T> {
    pool: Pool<T>,
}

impl<T: Send + Sync + 'static> PoolWrapper<T> {
    /// Wrap a new pool built from a fallible factory.
    pub fn new<F>(config: PoolConfig<T>, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, ConstructionError> + Send + Sync + 'static,
    {
        Ok(Self {
            pool: Pool::new(config, factory)?,
        })
    }

    /// Wrap a new pool built from an infallible factory.
    pub fn from_fn<F>(config: PoolConfig<T>, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Ok(Self {
            pool: Pool::from_fn(config, factory)?,
        })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    /// Check out a resource from the default scope for the duration of `op`.
    pub fn call<R>(&self, op: impl FnOnce(&T) -> R) -> PoolResult<R> {
        self.pool.checkout(op)
    }
}
