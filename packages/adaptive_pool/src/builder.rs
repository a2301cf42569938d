use std::any::type_name;
use std::fmt;
use std::num::NonZero;

use crate::policy::{CountGate, FnPolicy, Initializer, Logger, Releaser, Restorer};
use crate::{AdaptivePool, BoxedError, Result};

/// Builder for creating an instance of [`AdaptivePool`] from closures.
///
/// The initializer is mandatory, whereas all other settings are optional. See
/// [`ResourcePolicy`][crate::ResourcePolicy] for the meaning of each policy and for the
/// constraints they must respect (they run under the pool's lock).
///
/// # Examples
///
/// A pool that never shrinks:
///
/// ```
/// use adaptive_pool::AdaptivePool;
///
/// let pool = AdaptivePool::builder()
///     .initializer(|| vec![String::new(), String::new()])
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.idle_count(), 2);
/// ```
///
/// A pool that shrinks to two active resources under low demand and regrows on request:
///
/// ```
/// use adaptive_pool::AdaptivePool;
///
/// let pool = AdaptivePool::builder()
///     .initializer(|| vec![0_u64; 4])
///     .should_release(|active| active > 2)
///     .can_restore(|active| active < 2)
///     .restore(|_index| Some(0))
///     .release(|value| *value = 0)
///     .logger(|message| println!("pool: {message}"))
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.capacity(), 4);
/// ```
#[must_use]
pub struct AdaptivePoolBuilder<T> {
    initializer: Option<Initializer<T>>,
    can_restore: Option<CountGate>,
    should_release: Option<CountGate>,
    restore: Option<Restorer<T>>,
    release: Option<Releaser<T>>,
    logger: Option<Logger>,
    min_active: NonZero<usize>,
}

impl<T> fmt::Debug for AdaptivePoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("has_initializer", &self.initializer.is_some())
            .field("has_can_restore", &self.can_restore.is_some())
            .field("has_should_release", &self.should_release.is_some())
            .field("has_restore", &self.restore.is_some())
            .field("has_release", &self.release.is_some())
            .field("has_logger", &self.logger.is_some())
            .field("min_active", &self.min_active)
            .finish()
    }
}

impl<T> AdaptivePoolBuilder<T>
where
    T: Send + 'static,
{
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            initializer: None,
            can_restore: None,
            should_release: None,
            restore: None,
            release: None,
            logger: None,
            min_active: NonZero::<usize>::MIN,
        }
    }

    /// Sets an infallible resource initializer. The returned resources define the fixed number
    /// of slots in the pool.
    ///
    /// This replaces any previously configured initializer but keeps all other policies.
    ///
    /// # Examples
    ///
    /// ```
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![1, 2, 3])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(pool.capacity(), 3);
    /// ```
    #[inline]
    pub fn initializer<F>(self, initializer: F) -> Self
    where
        F: Fn() -> Vec<T> + Send + Sync + 'static,
    {
        self.set_initializer(Box::new(move || Ok(initializer())))
    }

    /// Sets a fallible resource initializer. An error returned by it makes
    /// [`build()`](Self::build) fail with [`Error::Initialize`][crate::Error::Initialize].
    ///
    /// This replaces any previously configured initializer but keeps all other policies.
    ///
    /// # Examples
    ///
    /// ```
    /// use adaptive_pool::{AdaptivePool, Error};
    ///
    /// let result = AdaptivePool::<String>::builder()
    ///     .try_initializer(|| Err("backend unavailable"))
    ///     .build();
    ///
    /// assert!(matches!(result, Err(Error::Initialize { .. })));
    /// ```
    #[inline]
    pub fn try_initializer<F, E>(self, initializer: F) -> Self
    where
        F: Fn() -> std::result::Result<Vec<T>, E> + Send + Sync + 'static,
        E: Into<BoxedError>,
    {
        self.set_initializer(Box::new(move || initializer().map_err(Into::into)))
    }

    fn set_initializer(mut self, initializer: Initializer<T>) -> Self {
        self.initializer = Some(initializer);
        self
    }

    /// Sets the gate that decides, given the active slot count, whether released slots should
    /// be restored before an acquire request is served.
    ///
    /// Defaults to never restoring.
    #[inline]
    pub fn can_restore<F>(mut self, can_restore: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.can_restore = Some(Box::new(can_restore));
        self
    }

    /// Sets the gate that decides, given the active slot count, whether an acquire request
    /// should release an idle slot instead of being served.
    ///
    /// Defaults to never releasing.
    #[inline]
    pub fn should_release<F>(mut self, should_release: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.should_release = Some(Box::new(should_release));
        self
    }

    /// Sets the function that creates a replacement resource for a released slot, given the
    /// slot index. Returning `None` leaves the slot released until the next attempt.
    ///
    /// Defaults to always failing.
    #[inline]
    pub fn restore<F>(mut self, restore: F) -> Self
    where
        F: Fn(usize) -> Option<T> + Send + Sync + 'static,
    {
        self.restore = Some(Box::new(restore));
        self
    }

    /// Sets the teardown applied to a resource right before the pool drops it, either when the
    /// pool shrinks or when the pool itself is dropped.
    ///
    /// Defaults to no teardown beyond dropping the resource.
    #[inline]
    pub fn release<F>(mut self, release: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    /// Sets a sink that receives a human-readable message for each notable pool event.
    ///
    /// Defaults to discarding messages. The same events are always emitted via `tracing`.
    #[inline]
    pub fn logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Box::new(logger));
        self
    }

    /// Sets the number of active slots at or below which the pool no longer releases slots,
    /// regardless of what the `should_release` gate says.
    ///
    /// Defaults to 1, meaning the last active slot is never released.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use adaptive_pool::AdaptivePool;
    ///
    /// let pool = AdaptivePool::builder()
    ///     .initializer(|| vec![(); 4])
    ///     .should_release(|_| true)
    ///     .min_active(NonZero::new(2).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// for _ in 0..10 {
    ///     assert!(pool.acquire().is_none());
    /// }
    ///
    /// assert_eq!(pool.active_count(), 2);
    /// ```
    #[inline]
    pub fn min_active(mut self, min_active: NonZero<usize>) -> Self {
        self.min_active = min_active;
        self
    }

    /// Builds the pool, invoking the initializer exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialize`][crate::Error::Initialize] if the initializer fails.
    ///
    /// # Panics
    ///
    /// Panics if no initializer has been set using either [`initializer`](Self::initializer)
    /// or [`try_initializer`](Self::try_initializer).
    #[inline]
    pub fn build(self) -> Result<AdaptivePool<T>> {
        let initializer = self.initializer.expect(
            "initializer must be set using .initializer() or .try_initializer() before calling .build()",
        );

        let mut policy = FnPolicy::new(initializer);

        if let Some(can_restore) = self.can_restore {
            policy.can_restore = can_restore;
        }

        if let Some(should_release) = self.should_release {
            policy.should_release = should_release;
        }

        if let Some(restore) = self.restore {
            policy.restore = restore;
        }

        if let Some(release) = self.release {
            policy.release = release;
        }

        if let Some(logger) = self.logger {
            policy.logger = logger;
        }

        AdaptivePool::new_inner(Box::new(policy), self.min_active)
    }
}
