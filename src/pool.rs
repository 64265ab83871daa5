//! Core pool implementation

use crate::config::{CollectionPolicy, DetachPredicate, PoolConfig};
use crate::errors::{ConstructionError, PoolError, PoolResult};
use crate::scope::Scope;
use crate::stats::{PoolStats, StatsTracker};

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

type Factory<T> = Box<dyn Fn() -> Result<T, ConstructionError> + Send + Sync>;

/// One slot of the allocation table: either a capacity reservation for a
/// resource still under construction, or the held resource plus its
/// per-checkout detach override flag.
enum Lease<T> {
    Pending,
    Ready { resource: Arc<T>, detach: bool },
}

/// Everything behind the pool lock. `size()` is only meaningful while the
/// lock is held.
struct Shared<T> {
    available: VecDeque<Arc<T>>,
    allocated: HashMap<Scope, HashMap<ThreadId, Lease<T>>>,
    maximum_size: usize,
    timeout: Duration,
    collection_policy: CollectionPolicy,
    detach_predicate: DetachPredicate<T>,
}

impl<T> Shared<T> {
    /// Live resource count: idle + checked out + in flight (Pending leases
    /// count, they hold a capacity unit).
    fn size(&self) -> usize {
        self.available.len() + self.allocated.values().map(HashMap::len).sum::<usize>()
    }

    fn pop_idle(&mut self) -> Option<Arc<T>> {
        match self.collection_policy {
            CollectionPolicy::Fifo => self.available.pop_front(),
            CollectionPolicy::Lifo => self.available.pop_back(),
        }
    }

    fn lease(&self, scope: &Scope, thread: ThreadId) -> Option<&Lease<T>> {
        self.allocated.get(scope)?.get(&thread)
    }

    fn lease_mut(&mut self, scope: &Scope, thread: ThreadId) -> Option<&mut Lease<T>> {
        self.allocated.get_mut(scope)?.get_mut(&thread)
    }

    fn insert_lease(&mut self, scope: &Scope, thread: ThreadId, lease: Lease<T>) {
        self.allocated
            .entry(scope.clone())
            .or_default()
            .insert(thread, lease);
    }

    fn remove_lease(&mut self, scope: &Scope, thread: ThreadId) -> Option<Lease<T>> {
        let slots = self.allocated.get_mut(scope)?;
        let lease = slots.remove(&thread);
        if slots.is_empty() {
            self.allocated.remove(scope);
        }
        lease
    }
}

/// A bounded, thread-safe pool of reusable resources.
///
/// Resources are produced by a caller-supplied factory, handed out through
/// [`checkout`](Pool::checkout), and returned automatically when the checkout
/// body finishes, whether it returns normally or panics. Checkouts block up
/// to the configured timeout when the pool is at capacity with nothing idle.
///
/// The pool tracks resources by identity and never inspects them; callers
/// that need to mutate a resource use interior mutability (a pooled database
/// connection would be a `Mutex<Conn>`, say).
///
/// # Examples
///
/// ```
/// use tarn::{Pool, PoolConfig};
///
/// let pool = Pool::from_fn(PoolConfig::new().with_maximum_size(2), || vec![0u8; 1024]).unwrap();
///
/// let len = pool.checkout(|buf| buf.len()).unwrap();
/// assert_eq!(len, 1024);
/// assert_eq!(pool.size(), 1);
/// ```
pub struct Pool<T> {
    shared: Mutex<Shared<T>>,
    idle_or_free: Condvar,
    factory: Factory<T>,
    stats: StatsTracker,
}

impl<T: Send + Sync + 'static> Pool<T> {
    /// Create a pool around a fallible factory.
    ///
    /// With `eager` configured, `maximum_size` resources are constructed
    /// synchronously before the pool is returned; the first factory error
    /// aborts creation.
    pub fn new<F>(config: PoolConfig<T>, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, ConstructionError> + Send + Sync + 'static,
    {
        let stats = StatsTracker::default();
        let mut available = VecDeque::new();
        if config.eager {
            for _ in 0..config.maximum_size {
                let resource = factory().map_err(PoolError::Construction)?;
                stats.record_constructed();
                available.push_back(Arc::new(resource));
            }
        }
        Ok(Self {
            shared: Mutex::new(Shared {
                available,
                allocated: HashMap::new(),
                maximum_size: config.maximum_size,
                timeout: config.timeout,
                collection_policy: config.collection_policy,
                detach_predicate: config.detach_predicate,
            }),
            idle_or_free: Condvar::new(),
            factory: Box::new(factory),
            stats,
        })
    }

    /// Create a pool around an infallible factory.
    pub fn from_fn<F>(config: PoolConfig<T>, factory: F) -> PoolResult<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(config, move || Ok(factory()))
    }

    /// Check out a resource in the default scope and run `body` against it.
    ///
    /// If the calling thread already holds a resource in the default scope,
    /// `body` runs against that same resource and nothing is acquired or
    /// released; nesting is unlimited. Otherwise a resource is acquired,
    /// constructing one if the pool is below capacity, or blocking until one
    /// frees up or the timeout passes. Checkin is guaranteed on every exit
    /// path, including a panicking `body`.
    pub fn checkout<R>(&self, body: impl FnOnce(&T) -> R) -> PoolResult<R> {
        self.checkout_in(Scope::Default, body)
    }

    /// Check out a resource in the given scope.
    ///
    /// Scopes partition holdings, not the idle store: the same thread can
    /// hold one resource per scope concurrently, and a resource checked in
    /// from any scope is reusable by all of them.
    pub fn checkout_in<R>(&self, scope: Scope, body: impl FnOnce(&T) -> R) -> PoolResult<R> {
        let thread = thread::current().id();
        if let Some(held) = self.current_resource(&scope, thread) {
            return Ok(body(&held));
        }
        let resource = self.acquire(&scope, thread)?;
        let guard = CheckinGuard {
            pool: self,
            scope: &scope,
            thread,
        };
        let output = body(&resource);
        drop(guard);
        Ok(output)
    }

    /// Read the detach override flag for the calling thread's active
    /// checkout in the default scope.
    ///
    /// The flag starts `false` at each acquisition. Set to `true`, it forces
    /// the held resource to be discarded at checkin; the detach predicate is
    /// not consulted. Fails with [`PoolError::NoActiveCheckout`] outside an
    /// active checkout.
    pub fn detach_on_checkin(&self) -> PoolResult<bool> {
        self.detach_on_checkin_in(&Scope::Default)
    }

    /// Scoped variant of [`detach_on_checkin`](Pool::detach_on_checkin).
    pub fn detach_on_checkin_in(&self, scope: &Scope) -> PoolResult<bool> {
        let shared = self.shared.lock();
        match shared.lease(scope, thread::current().id()) {
            Some(Lease::Ready { detach, .. }) => Ok(*detach),
            _ => Err(PoolError::NoActiveCheckout),
        }
    }

    /// Set the detach override flag for the calling thread's active checkout
    /// in the default scope.
    pub fn set_detach_on_checkin(&self, detach: bool) -> PoolResult<()> {
        self.set_detach_on_checkin_in(&Scope::Default, detach)
    }

    /// Scoped variant of [`set_detach_on_checkin`](Pool::set_detach_on_checkin).
    pub fn set_detach_on_checkin_in(&self, scope: &Scope, detach: bool) -> PoolResult<()> {
        let mut shared = self.shared.lock();
        match shared.lease_mut(scope, thread::current().id()) {
            Some(Lease::Ready { detach: flag, .. }) => {
                *flag = detach;
                Ok(())
            }
            _ => Err(PoolError::NoActiveCheckout),
        }
    }

    /// Current live resource count: idle + checked out + under construction.
    pub fn size(&self) -> usize {
        self.shared.lock().size()
    }

    /// Number of idle resources.
    pub fn available_count(&self) -> usize {
        self.shared.lock().available.len()
    }

    /// Number of checked-out or in-flight resources across all scopes.
    pub fn allocated_count(&self) -> usize {
        let shared = self.shared.lock();
        shared.allocated.values().map(HashMap::len).sum()
    }

    /// Idle resources in store order (front is the oldest-returned).
    pub fn available_snapshot(&self) -> Vec<Arc<T>> {
        self.shared.lock().available.iter().cloned().collect()
    }

    /// Holder counts per scope, for diagnostics.
    pub fn allocated_snapshot(&self) -> Vec<(Scope, usize)> {
        let shared = self.shared.lock();
        shared
            .allocated
            .iter()
            .map(|(scope, slots)| (scope.clone(), slots.len()))
            .collect()
    }

    /// Usage counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// The checkout timeout.
    pub fn timeout(&self) -> Duration {
        self.shared.lock().timeout
    }

    /// Set the checkout timeout. Applies to checkouts entered afterwards.
    pub fn set_timeout(&self, timeout: Duration) {
        self.shared.lock().timeout = timeout;
    }

    /// The removal order for idle resources.
    pub fn collection_policy(&self) -> CollectionPolicy {
        self.shared.lock().collection_policy
    }

    /// Set the removal order for idle resources.
    pub fn set_collection_policy(&self, policy: CollectionPolicy) {
        self.shared.lock().collection_policy = policy;
    }

    /// The maximum number of live resources.
    pub fn maximum_size(&self) -> usize {
        self.shared.lock().maximum_size
    }

    /// Change the capacity bound.
    ///
    /// Lowering it discards idle resources (per the collection policy) until
    /// the pool fits or none remain idle; resources still checked out are
    /// drained lazily, discarded at their next checkin. Raising it wakes all
    /// blocked acquirers so they can retry the capacity check.
    pub fn set_maximum_size(&self, maximum_size: usize) {
        let mut evicted = Vec::new();
        {
            let mut shared = self.shared.lock();
            let raised = maximum_size > shared.maximum_size;
            shared.maximum_size = maximum_size;
            while shared.size() > maximum_size {
                match shared.pop_idle() {
                    Some(resource) => evicted.push(resource),
                    None => break, // the surplus is checked out; drained at checkin
                }
            }
            if raised {
                self.idle_or_free.notify_all();
            }
        }
        for _ in 0..evicted.len() {
            self.stats.record_detached();
        }
        // evicted resources are dropped here, outside the lock
    }

    /// Replace the detach predicate. Applies to checkins from then on.
    pub fn set_detach_predicate<F>(&self, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.shared.lock().detach_predicate = Arc::new(predicate);
    }

    fn current_resource(&self, scope: &Scope, thread: ThreadId) -> Option<Arc<T>> {
        let shared = self.shared.lock();
        match shared.lease(scope, thread) {
            Some(Lease::Ready { resource, .. }) => Some(Arc::clone(resource)),
            _ => None,
        }
    }

    /// The acquisition loop. The deadline is fixed once at entry; the first
    /// acquisition attempt always precedes the first deadline check, so a
    /// zero timeout still succeeds against an idle store.
    fn acquire(&self, scope: &Scope, thread: ThreadId) -> PoolResult<Arc<T>> {
        let mut shared = self.shared.lock();
        let timeout = shared.timeout;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(resource) = shared.pop_idle() {
                let handle = Arc::clone(&resource);
                shared.insert_lease(
                    scope,
                    thread,
                    Lease::Ready {
                        resource,
                        detach: false,
                    },
                );
                drop(shared);
                self.stats.record_checkout();
                return Ok(handle);
            }
            if shared.size() < shared.maximum_size {
                // Reserve the capacity unit now; the factory runs unlocked.
                shared.insert_lease(scope, thread, Lease::Pending);
                break;
            }
            if Instant::now() >= deadline {
                drop(shared);
                self.stats.record_timeout();
                return Err(PoolError::Timeout(timeout));
            }
            // Spurious wakeups are fine; the loop re-validates its own
            // condition rather than trusting the signal.
            let _ = self.idle_or_free.wait_until(&mut shared, deadline);
        }
        drop(shared);
        self.construct(scope, thread)
    }

    /// Run the factory without the lock held; it may be slow or fail and
    /// must not block unrelated checkouts or checkins. The Pending lease
    /// holds the capacity unit in the meantime.
    fn construct(&self, scope: &Scope, thread: ThreadId) -> PoolResult<Arc<T>> {
        match (self.factory)() {
            Ok(value) => {
                let resource = Arc::new(value);
                let handle = Arc::clone(&resource);
                {
                    let mut shared = self.shared.lock();
                    if let Some(lease) = shared.lease_mut(scope, thread) {
                        *lease = Lease::Ready {
                            resource,
                            detach: false,
                        };
                    }
                }
                self.stats.record_constructed();
                self.stats.record_checkout();
                Ok(handle)
            }
            Err(source) => {
                // Unwind the reservation and let another thread claim the
                // freed capacity unit.
                {
                    let mut shared = self.shared.lock();
                    shared.remove_lease(scope, thread);
                }
                self.idle_or_free.notify_one();
                self.stats.record_construction_failure();
                Err(PoolError::Construction(source))
            }
        }
    }

    /// Return or discard the calling thread's held resource. Runs exactly
    /// once per completed acquisition, via [`CheckinGuard`].
    fn checkin(&self, scope: &Scope, thread: ThreadId) {
        let (resource, forced, keep_candidate, predicate) = {
            let mut shared = self.shared.lock();
            // Take the resource out but leave a Pending reservation behind,
            // so size() stays accurate while the predicate runs unlocked.
            let taken = shared.lease_mut(scope, thread).and_then(|lease| {
                match std::mem::replace(lease, Lease::Pending) {
                    Lease::Ready { resource, detach } => Some((resource, detach)),
                    Lease::Pending => None,
                }
            });
            let Some((resource, forced)) = taken else {
                shared.remove_lease(scope, thread);
                self.idle_or_free.notify_one();
                return;
            };
            let keep_candidate = shared.size() <= shared.maximum_size;
            let predicate = Arc::clone(&shared.detach_predicate);
            (resource, forced, keep_candidate, predicate)
        };

        // A panicking predicate counts as a detach verdict; the payload is
        // re-raised once the pool's bookkeeping is consistent again.
        let verdict: thread::Result<bool> = if forced || !keep_candidate {
            Ok(false)
        } else {
            panic::catch_unwind(AssertUnwindSafe(|| !predicate(&resource)))
        };
        let keep = matches!(verdict, Ok(true));

        let mut discarded = None;
        {
            let mut shared = self.shared.lock();
            shared.remove_lease(scope, thread);
            if keep {
                shared.available.push_back(resource);
            } else {
                discarded = Some(resource);
            }
        }
        self.idle_or_free.notify_one();
        if discarded.is_some() {
            self.stats.record_detached();
        }
        drop(discarded);
        if let Err(payload) = verdict
            && !thread::panicking()
        {
            panic::resume_unwind(payload);
        }
    }
}

/// Guarantees checkin on every exit path of the checkout body, including
/// unwinding.
struct CheckinGuard<'a, T: Send + Sync + 'static> {
    pool: &'a Pool<T>,
    scope: &'a Scope,
    thread: ThreadId,
}

impl<T: Send + Sync + 'static> Drop for CheckinGuard<'_, T> {
    fn drop(&mut self) {
        self.pool.checkin(self.scope, self.thread);
    }
}
