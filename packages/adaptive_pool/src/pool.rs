//! The pool and its shared state.

use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{AdaptivePoolBuilder, Error, Lease, ResourcePolicy, Result, SlotState, SlotTable};

/// State shared by all handles to one pool and by all of its outstanding leases.
pub(crate) struct PoolInner<T>
where
    T: Send + 'static,
{
    // The single lock that serializes every state transition of every slot.
    slots: Mutex<SlotTable<T>>,
    policy: Box<dyn ResourcePolicy<Resource = T>>,
    min_active: NonZero<usize>,
}

impl<T> fmt::Debug for PoolInner<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();

        f.debug_struct(type_name::<Self>())
            .field("capacity", &slots.capacity())
            .field("active_count", &slots.active_count())
            .field("idle_count", &slots.idle_count())
            .field("min_active", &self.min_active)
            .finish_non_exhaustive()
    }
}

impl<T> PoolInner<T>
where
    T: Send + 'static,
{
    /// Tries to restore every released slot, if the restore gate allows it.
    ///
    /// The gate is consulted on every call, even when no slot is released.
    /// A failed restoration leaves the slot released; the next call tries again.
    fn recover(&self, slots: &mut SlotTable<T>) -> usize {
        if !self.policy.can_restore(slots.active_count()) {
            return 0;
        }

        slots
            .released_indexes()
            .into_iter()
            .filter(|&index| self.restore_slot(slots, index))
            .count()
    }

    fn restore_slot(&self, slots: &mut SlotTable<T>, index: usize) -> bool {
        let Some(resource) = self.policy.restore(index) else {
            warn!(index, "failed to restore released resource");
            self.policy
                .log(&format!("failed to restore resource [{index}]"));
            return false;
        };

        match slots.restore(index, resource) {
            Ok(()) => {
                debug!(index, "restored resource");
                self.policy.log(&format!("restored resource [{index}]"));
                true
            }
            Err(resource) => {
                // Only released slots are ever offered for restoration, so this cannot happen
                // while the lock is held.
                self.discard_orphan(index, resource);
                false
            }
        }
    }

    /// Releases the first idle slot at or after `start`, unless the pool is already at its
    /// minimum number of active slots.
    fn release_one(&self, slots: &mut SlotTable<T>, start: usize) {
        let active_count = slots.active_count();

        let Some(index) = slots.first_idle_from(start) else {
            return;
        };

        if active_count <= self.min_active.get() {
            trace!(index, active_count, "release skipped at minimum active count");
            return;
        }

        // The slot is marked released before the teardown runs, so a panicking teardown leaves
        // a consistent table behind: released slot, resource dropped during unwinding.
        let Some(mut resource) = slots.mark_released(index) else {
            return;
        };

        self.policy.release(&mut resource);
        drop(resource);

        debug!(index, "released resource");
        self.policy.log(&format!("released resource [{index}]"));
    }

    /// Puts a leased resource back into its slot. Called when a lease is dropped.
    pub(crate) fn return_resource(&self, index: usize, resource: T) {
        let mut slots = self.slots.lock();

        match slots.put_back(index, resource) {
            Ok(()) => trace!(index, "resource returned"),
            Err(resource) => {
                // The lease held the only claim on this busy slot, so this is unreachable
                // unless the table itself has been corrupted.
                self.discard_orphan(index, resource);
            }
        }
    }

    /// Tears down a resource that no slot will accept.
    #[cfg_attr(test, mutants::skip)] // Only reachable with a corrupted slot table - cannot be provoked from tests.
    fn discard_orphan(&self, index: usize, mut resource: T) {
        warn!(index, "resource does not fit the state of its slot");
        self.policy.log("tried to release unknown resource");
        self.policy.release(&mut resource);
    }
}

impl<T> Drop for PoolInner<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        // Every lease holds a reference to us, so no slot can be busy any more.
        for (index, mut resource) in self.slots.get_mut().drain_idle() {
            self.policy.release(&mut resource);
            trace!(index, "resource torn down");
        }

        debug!("adaptive pool destroyed");
        self.policy.log("adaptive pool destroyed");
    }
}

/// A thread-safe pool of reusable resources that shrinks under low demand and regrows under
/// high demand, driven by a caller-supplied [`ResourcePolicy`].
///
/// The pool has a fixed number of slots, one per resource returned by the initializer. Each
/// slot is at any time either idle (its resource is available), busy (its resource is leased
/// to a caller) or released (its resource has been torn down to shrink the pool).
///
/// This type is a cloneable handle to a shared pool instance. Cloning the handle does not clone
/// any resources.
///
/// # Thread safety
///
/// Every operation takes one pool-wide lock for its entire duration, so operations are
/// serialized. Policies run while that lock is held. No operation waits for a resource to
/// become available - [`acquire()`](Self::acquire) returns `None` immediately instead.
///
/// # Example
///
/// ```rust
/// use std::thread;
///
/// use adaptive_pool::AdaptivePool;
///
/// let pool = AdaptivePool::builder()
///     .initializer(|| (0..4).map(|id| format!("connection-{id}")).collect())
///     .build()
///     .unwrap();
///
/// let pool_clone = pool.clone();
///
/// let handle = thread::spawn(move || {
///     let connection = pool_clone.acquire().expect("pool has idle connections");
///     connection.len()
/// });
///
/// assert_eq!(handle.join().unwrap(), "connection-0".len());
/// assert_eq!(pool.idle_count(), 4);
/// ```
pub struct AdaptivePool<T>
where
    T: Send + 'static,
{
    inner: Arc<PoolInner<T>>,
}

impl<T> AdaptivePool<T>
where
    T: Send + 'static,
{
    /// Returns a builder for creating an [`AdaptivePool`] from closures.
    ///
    /// # Example
    ///
    /// ```rust
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![0_u8; 16])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    pub fn builder() -> AdaptivePoolBuilder<T> {
        AdaptivePoolBuilder::new()
    }

    /// Creates a pool governed by the given policy set, invoking
    /// [`initialize()`](ResourcePolicy::initialize) exactly once.
    ///
    /// The pool never releases its last active slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialize`] if the policy fails to create the initial resources.
    pub fn with_policy<P>(policy: P) -> Result<Self>
    where
        P: ResourcePolicy<Resource = T>,
    {
        Self::new_inner(Box::new(policy), NonZero::<usize>::MIN)
    }

    pub(crate) fn new_inner(
        policy: Box<dyn ResourcePolicy<Resource = T>>,
        min_active: NonZero<usize>,
    ) -> Result<Self> {
        let resources = policy
            .initialize()
            .map_err(|source| Error::Initialize { source })?;

        debug!(capacity = resources.len(), "adaptive pool created");

        if resources.is_empty() {
            warn!("adaptive pool created without any resources; acquire will never succeed");
        }

        Ok(Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new(SlotTable::new(resources)),
                policy,
                min_active,
            }),
        })
    }

    /// Acquires an idle resource, or returns `None` if no resource can be handed out by this
    /// call.
    ///
    /// Before looking for an idle slot, the pool asks the `can_restore` policy whether to
    /// restore its released slots and, if so, tries to restore every one of them.
    ///
    /// When an idle slot is found, the `should_release` policy decides whether this call
    /// shrinks the pool instead of being served. In that case the first idle slot is torn down
    /// (unless the pool is at its minimum active count) and this call returns `None`, even
    /// though other idle slots may still exist.
    ///
    /// # Example
    ///
    /// ```rust
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![1, 2])
    ///     .build()
    ///     .unwrap();
    ///
    /// let first = pool.acquire().unwrap();
    /// let second = pool.acquire().unwrap();
    /// assert!(pool.acquire().is_none());
    ///
    /// assert_eq!(*first + *second, 3);
    /// ```
    #[must_use]
    pub fn acquire(&self) -> Option<Lease<T>> {
        let mut slots = self.inner.slots.lock();

        self.inner.recover(&mut slots);

        let index = slots.first_idle_from(0)?;

        if self.inner.policy.should_release(slots.active_count()) {
            self.inner.release_one(&mut slots, index);
            return None;
        }

        let resource = slots.take_idle(index)?;
        drop(slots);

        trace!(index, "resource acquired");
        Some(Lease::new(resource, index, Arc::clone(&self.inner)))
    }

    /// Returns a leased resource to the pool, making its slot idle again.
    ///
    /// Dropping the lease has the same effect. A lease acquired from a different pool is not
    /// accepted: a warning is logged and this pool is left unchanged, while the lease goes back
    /// to the pool it came from.
    ///
    /// # Example
    ///
    /// ```rust
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![1])
    ///     .build()
    ///     .unwrap();
    ///
    /// let lease = pool.acquire().unwrap();
    /// assert_eq!(pool.idle_count(), 0);
    ///
    /// pool.release(lease);
    /// assert_eq!(pool.idle_count(), 1);
    /// ```
    pub fn release(&self, lease: Lease<T>) {
        if !lease.belongs_to(&self.inner) {
            let _slots = self.inner.slots.lock();

            warn!(
                index = lease.index(),
                "tried to release a resource that does not belong to this pool"
            );
            self.inner.policy.log("tried to release unknown resource");
            return;
        }

        // The lease puts its resource back when dropped.
        drop(lease);
    }

    /// Returns the number of idle resources, i.e. slots that are neither busy nor released.
    ///
    /// This operation may block if another thread is currently accessing the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.slots.lock().idle_count()
    }

    /// Returns the number of active slots, i.e. slots backed by a live resource, whether idle
    /// or busy.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.slots.lock().active_count()
    }

    /// Returns the number of resources currently leased to callers.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.inner.slots.lock().busy_count()
    }

    /// Returns the number of slots whose resource has been released and not yet restored.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.inner.slots.lock().released_count()
    }

    /// Returns the fixed number of slots, which is the number of resources the initializer
    /// created.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.slots.lock().capacity()
    }

    /// Returns a snapshot of the state of every slot, in slot index order.
    #[must_use]
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.inner.slots.lock().states()
    }

    /// Runs the restore step of [`acquire()`](Self::acquire) without acquiring anything,
    /// returning the number of slots that were restored.
    ///
    /// Nothing is restored unless the `can_restore` policy allows it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![0_u32; 3])
    ///     .should_release(|active| active > 1)
    ///     .build()
    ///     .unwrap();
    ///
    /// // Low demand: the pool shrinks to a single active slot.
    /// assert!(pool.acquire().is_none());
    /// assert!(pool.acquire().is_none());
    /// assert_eq!(pool.active_count(), 1);
    ///
    /// // Restoring is disabled by default.
    /// assert_eq!(pool.restore_released(), 0);
    /// ```
    pub fn restore_released(&self) -> usize {
        let mut slots = self.inner.slots.lock();
        self.inner.recover(&mut slots)
    }
}

impl<T> Clone for AdaptivePool<T>
where
    T: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for AdaptivePool<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("inner", &self.inner)
            .finish()
    }
}
