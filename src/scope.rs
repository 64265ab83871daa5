//! Allocation scopes
//!
//! A scope partitions the allocation table, letting one thread hold several
//! independent resources from the same pool at once (one per scope). Scopes
//! never partition the availability store; idle resources are shared across
//! all scopes.

use std::sync::Arc;

/// An immutable key identifying one partition of the allocation table.
///
/// Most callers use [`Scope::Default`] implicitly via
/// [`Pool::checkout`](crate::Pool::checkout). Named scopes matter when a
/// single thread needs to hold more than one resource concurrently:
///
/// ```
/// use tarn::{Pool, PoolConfig, Scope};
///
/// let pool = Pool::from_fn(PoolConfig::new(), || vec![0u8; 16]).unwrap();
/// pool.checkout_in(Scope::from("a"), |_first| {
///     pool.checkout_in(Scope::from("b"), |_second| {
///         // two distinct resources, one thread
///     })
/// }).unwrap().unwrap();
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The shared default scope.
    #[default]
    Default,
    /// A named scope. The name is reference-counted and immutable.
    Named(Arc<str>),
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::Named(Arc::from(name))
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Scope::Named(Arc::from(name))
    }
}
