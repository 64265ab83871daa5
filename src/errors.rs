//! Error types for the pool

use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a resource factory.
pub type ConstructionError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    /// The checkout deadline passed while waiting for an idle resource or a
    /// free capacity unit. No allocation entry remains for the caller.
    #[error("checkout timed out after {0:?}")]
    Timeout(Duration),

    /// The factory failed while constructing a resource. The reserved
    /// capacity unit was released and one waiter was woken.
    #[error("resource construction failed")]
    Construction(#[source] ConstructionError),

    /// A detach override accessor was used by a thread that holds no
    /// resource in the given scope.
    #[error("no active checkout for this thread and scope")]
    NoActiveCheckout,
}

pub type PoolResult<T> = Result<T, PoolError>;
