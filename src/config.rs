//! Pool configuration options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Removal order for idle resources in the availability store.
///
/// Insertion order is fixed (most recently returned at the back); the policy
/// only governs which end is popped on checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectionPolicy {
    /// Pop the oldest-returned resource first ("queue"). Round-robins usage
    /// across every constructed resource.
    #[default]
    Fifo,
    /// Pop the most-recently-returned resource first ("stack"). Maximizes
    /// reuse locality.
    Lifo,
}

pub(crate) type DetachPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Configuration for pool behavior
///
/// # Examples
///
/// ```
/// use tarn::{CollectionPolicy, PoolConfig};
/// use std::time::Duration;
///
/// let config = PoolConfig::<i32>::new()
///     .with_maximum_size(4)
///     .with_timeout(Duration::from_millis(250))
///     .with_collection_policy(CollectionPolicy::Lifo)
///     .with_eager(true);
///
/// assert_eq!(config.maximum_size, 4);
/// assert!(config.eager);
/// ```
pub struct PoolConfig<T> {
    /// Maximum number of live resources (idle + checked out + in flight).
    pub maximum_size: usize,

    /// How long a checkout blocks before failing with a timeout.
    pub timeout: Duration,

    /// Removal order for idle resources.
    pub collection_policy: CollectionPolicy,

    /// Construct `maximum_size` resources synchronously at pool creation.
    pub eager: bool,

    /// Evaluated at checkin; returning `true` detaches the resource instead
    /// of returning it to the pool. Runs without the pool lock held.
    pub detach_predicate: DetachPredicate<T>,
}

// Derived Clone would demand T: Clone; only the predicate Arc needs cloning.
impl<T> Clone for PoolConfig<T> {
    fn clone(&self) -> Self {
        Self {
            maximum_size: self.maximum_size,
            timeout: self.timeout,
            collection_policy: self.collection_policy,
            eager: self.eager,
            detach_predicate: Arc::clone(&self.detach_predicate),
        }
    }
}

impl<T> Default for PoolConfig<T> {
    fn default() -> Self {
        Self {
            maximum_size: 10,
            timeout: Duration::from_secs(1),
            collection_policy: CollectionPolicy::default(),
            eager: false,
            detach_predicate: Arc::new(|_| false),
        }
    }
}

impl<T> PoolConfig<T> {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of live resources.
    pub fn with_maximum_size(mut self, size: usize) -> Self {
        self.maximum_size = size;
        self
    }

    /// Set the checkout timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the removal order for idle resources.
    pub fn with_collection_policy(mut self, policy: CollectionPolicy) -> Self {
        self.collection_policy = policy;
        self
    }

    /// Construct all resources up front instead of lazily.
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// Set the detach predicate.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarn::PoolConfig;
    ///
    /// // Detach connections that went stale while checked out.
    /// let config = PoolConfig::<i32>::new()
    ///     .with_detach_predicate(|n| *n < 0);
    /// ```
    pub fn with_detach_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.detach_predicate = Arc::new(predicate);
        self
    }
}

impl<T> fmt::Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("maximum_size", &self.maximum_size)
            .field("timeout", &self.timeout)
            .field("collection_policy", &self.collection_policy)
            .field("eager", &self.eager)
            .finish_non_exhaustive()
    }
}
