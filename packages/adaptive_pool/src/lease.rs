use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::PoolInner;

const ERR_RESOURCE_TAKEN: &str = "lease resource is only taken when the lease is dropped";

/// Exclusive access to a resource acquired from an [`AdaptivePool`][crate::AdaptivePool].
///
/// The lease is the handle returned by [`acquire()`][crate::AdaptivePool::acquire]. While it
/// exists, its slot is busy and no other caller can acquire the same resource. Access the
/// resource via [`Deref`] and [`DerefMut`].
///
/// Return the resource by passing the lease to
/// [`AdaptivePool::release()`][crate::AdaptivePool::release] or simply by dropping it - both
/// make the slot idle again.
///
/// A lease keeps its pool alive, so the pool's resources are torn down only after the last
/// lease and the last pool handle are gone.
///
/// # Example
///
/// ```
/// use adaptive_pool::AdaptivePool;
///
/// let pool = AdaptivePool::builder()
///     .initializer(|| vec![String::from("conn-0")])
///     .build()
///     .unwrap();
///
/// let mut lease = pool.acquire().unwrap();
/// assert_eq!(lease.index(), 0);
/// lease.push_str("-in-use");
/// assert_eq!(&*lease, "conn-0-in-use");
///
/// pool.release(lease);
/// assert_eq!(pool.idle_count(), 1);
/// ```
pub struct Lease<T>
where
    T: Send + 'static,
{
    // Always `Some` until the lease is dropped.
    resource: Option<T>,
    index: usize,
    pool: Arc<PoolInner<T>>,
}

impl<T> Lease<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(resource: T, index: usize, pool: Arc<PoolInner<T>>) -> Self {
        Self {
            resource: Some(resource),
            index,
            pool,
        }
    }

    /// The index of the pool slot this lease was acquired from.
    ///
    /// Slot indexes are stable for the lifetime of the pool - a restored slot keeps its index.
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this lease was acquired from the pool behind `pool`.
    pub(crate) fn belongs_to(&self, pool: &Arc<PoolInner<T>>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }
}

impl<T> Deref for Lease<T>
where
    T: Send + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.resource.as_ref().expect(ERR_RESOURCE_TAKEN)
    }
}

impl<T> DerefMut for Lease<T>
where
    T: Send + 'static,
{
    fn deref_mut(&mut self) -> &mut T {
        self.resource.as_mut().expect(ERR_RESOURCE_TAKEN)
    }
}

impl<T> Drop for Lease<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.return_resource(self.index, resource);
        }
    }
}

impl<T> fmt::Debug for Lease<T>
where
    T: fmt::Debug + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("index", &self.index)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::{AdaptivePool, SlotState};

    assert_impl_all!(Lease<String>: Send, Sync, fmt::Debug);
    assert_not_impl_any!(Lease<String>: Clone);
    assert_not_impl_any!(Lease<std::cell::Cell<u8>>: Sync);

    fn pool_of(values: Vec<u32>) -> AdaptivePool<u32> {
        AdaptivePool::builder()
            .initializer(move || values.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn deref_reads_and_writes_resource() {
        let pool = pool_of(vec![10, 20]);

        let mut lease = pool.acquire().unwrap();
        assert_eq!(*lease, 10);

        *lease += 5;
        drop(lease);

        let lease = pool.acquire().unwrap();
        assert_eq!(*lease, 15);
    }

    #[test]
    fn drop_returns_resource_to_slot() {
        let pool = pool_of(vec![1, 2]);

        let lease = pool.acquire().unwrap();
        assert_eq!(pool.slot_states(), vec![SlotState::Busy, SlotState::Idle]);

        drop(lease);
        assert_eq!(pool.slot_states(), vec![SlotState::Idle, SlotState::Idle]);
    }

    #[test]
    fn index_matches_slot() {
        let pool = pool_of(vec![1, 2, 3]);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();

        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(*second, 2);
    }

    #[test]
    fn lease_keeps_pool_alive() {
        let pool = pool_of(vec![1]);
        let lease = pool.acquire().unwrap();

        drop(pool);

        // The pool state is still reachable through the lease.
        assert_eq!(*lease, 1);
        drop(lease);
    }

    #[test]
    fn debug_shows_index_and_resource() {
        let pool = pool_of(vec![42]);
        let lease = pool.acquire().unwrap();

        let debug_output = format!("{lease:?}");
        assert!(debug_output.contains("index: 0"));
        assert!(debug_output.contains("42"));
    }
}
