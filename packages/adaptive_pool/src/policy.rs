use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

/// A type-erased error returned by a failing resource initializer.
pub type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// The policy set that governs an [`AdaptivePool`][crate::AdaptivePool]: how resources are
/// created, when the pool shrinks or regrows and how resources are torn down.
///
/// Every method except [`initialize()`](Self::initialize) is called while the pool's lock is
/// held. Implementations must therefore return promptly, must not block and must not call back
/// into the pool - a slow policy stalls every other pool operation.
///
/// Implement this trait when the policy carries its own state. For ad-hoc policies, configure
/// closures via [`AdaptivePool::builder()`][crate::AdaptivePool::builder] instead.
///
/// # Example
///
/// ```
/// use adaptive_pool::{AdaptivePool, BoxedError, ResourcePolicy};
///
/// struct Buffers;
///
/// impl ResourcePolicy for Buffers {
///     type Resource = Vec<u8>;
///
///     fn initialize(&self) -> Result<Vec<Vec<u8>>, BoxedError> {
///         Ok(vec![Vec::with_capacity(1024); 4])
///     }
///
///     fn can_restore(&self, active_count: usize) -> bool {
///         active_count < 4
///     }
///
///     fn should_release(&self, active_count: usize) -> bool {
///         active_count > 2
///     }
///
///     fn restore(&self, _index: usize) -> Option<Vec<u8>> {
///         Some(Vec::with_capacity(1024))
///     }
///
///     fn release(&self, resource: &mut Vec<u8>) {
///         resource.clear();
///         resource.shrink_to_fit();
///     }
/// }
///
/// let pool = AdaptivePool::with_policy(Buffers).unwrap();
/// assert_eq!(pool.capacity(), 4);
/// ```
#[cfg_attr(test, mockall::automock(type Resource = u32;))]
pub trait ResourcePolicy: Send + Sync + 'static {
    /// The type of resource managed by the pool.
    type Resource: Send + 'static;

    /// Creates the initial set of resources. Called exactly once, when the pool is created.
    ///
    /// The number of resources returned becomes the fixed slot count of the pool.
    ///
    /// # Errors
    ///
    /// Any error returned here aborts pool creation and is surfaced as
    /// [`Error::Initialize`][crate::Error::Initialize].
    fn initialize(&self) -> Result<Vec<Self::Resource>, BoxedError>;

    /// Decides, given the number of active (not released) slots, whether the pool should try to
    /// restore its released slots before serving an acquire request.
    fn can_restore(&self, active_count: usize) -> bool;

    /// Decides, given the number of active (not released) slots, whether the current acquire
    /// request should shrink the pool by releasing an idle slot instead of being served.
    fn should_release(&self, active_count: usize) -> bool;

    /// Creates a replacement resource for the released slot at `index`.
    ///
    /// Returning `None` leaves the slot released. Restoration is retried on a later call.
    fn restore(&self, index: usize) -> Option<Self::Resource>;

    /// Tears down a resource before the pool discards it.
    ///
    /// The resource is dropped right after this returns.
    fn release(&self, resource: &mut Self::Resource);

    /// Receives a human-readable message for each notable pool event.
    ///
    /// The same events are also emitted as `tracing` events, so most policies can leave this
    /// as the default no-op.
    fn log(&self, message: &str) {
        _ = message;
    }
}

pub(crate) type Initializer<T> = Box<dyn Fn() -> Result<Vec<T>, BoxedError> + Send + Sync>;
pub(crate) type CountGate = Box<dyn Fn(usize) -> bool + Send + Sync>;
pub(crate) type Restorer<T> = Box<dyn Fn(usize) -> Option<T> + Send + Sync>;
pub(crate) type Releaser<T> = Box<dyn Fn(&mut T) + Send + Sync>;
pub(crate) type Logger = Box<dyn Fn(&str) + Send + Sync>;

/// A [`ResourcePolicy`] assembled from closures.
///
/// Created by [`AdaptivePoolBuilder`][crate::AdaptivePoolBuilder]; every policy that was not
/// configured falls back to a conservative default:
///
/// * `can_restore` and `should_release` never fire, so the pool stays at its initial size.
/// * `restore` always fails.
/// * `release` does nothing beyond dropping the resource.
/// * `logger` discards messages.
pub(crate) struct FnPolicy<T> {
    pub(crate) initializer: Initializer<T>,
    pub(crate) can_restore: CountGate,
    pub(crate) should_release: CountGate,
    pub(crate) restore: Restorer<T>,
    pub(crate) release: Releaser<T>,
    pub(crate) logger: Logger,
}

impl<T> FnPolicy<T> {
    pub(crate) fn new(initializer: Initializer<T>) -> Self {
        Self {
            initializer,
            can_restore: Box::new(|_| false),
            should_release: Box::new(|_| false),
            restore: Box::new(|_| None),
            release: Box::new(|_| {}),
            logger: Box::new(|_| {}),
        }
    }
}

impl<T> fmt::Debug for FnPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>()).finish_non_exhaustive()
    }
}

impl<T> ResourcePolicy for FnPolicy<T>
where
    T: Send + 'static,
{
    type Resource = T;

    fn initialize(&self) -> Result<Vec<T>, BoxedError> {
        (self.initializer)()
    }

    fn can_restore(&self, active_count: usize) -> bool {
        (self.can_restore)(active_count)
    }

    fn should_release(&self, active_count: usize) -> bool {
        (self.should_release)(active_count)
    }

    fn restore(&self, index: usize) -> Option<T> {
        (self.restore)(index)
    }

    fn release(&self, resource: &mut T) {
        (self.release)(resource);
    }

    fn log(&self, message: &str) {
        (self.logger)(message);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(FnPolicy<String>: Send, Sync, fmt::Debug);
    assert_impl_all!(MockResourcePolicy: Send, Sync);

    #[test]
    fn defaults_keep_pool_static() {
        let policy = FnPolicy::new(Box::new(|| Ok(vec![1_u32, 2])));

        assert_eq!(policy.initialize().unwrap(), vec![1, 2]);
        assert!(!policy.can_restore(0));
        assert!(!policy.should_release(usize::MAX));
        assert_eq!(policy.restore(0), None);

        let mut resource = 5_u32;
        policy.release(&mut resource);
        assert_eq!(resource, 5);

        policy.log("ignored");
    }

    #[test]
    fn configured_closures_are_used() {
        let mut policy = FnPolicy::new(Box::new(|| Ok(Vec::<u32>::new())));
        policy.can_restore = Box::new(|active| active < 3);
        policy.should_release = Box::new(|active| active > 3);
        policy.restore = Box::new(|index| u32::try_from(index).ok());
        policy.release = Box::new(|resource| *resource = 0);

        assert!(policy.can_restore(2));
        assert!(!policy.can_restore(3));
        assert!(policy.should_release(4));
        assert!(!policy.should_release(3));
        assert_eq!(policy.restore(7), Some(7));

        let mut resource = 5_u32;
        policy.release(&mut resource);
        assert_eq!(resource, 0);
    }

    #[test]
    fn initializer_error_is_returned() {
        let policy = FnPolicy::<u32>::new(Box::new(|| Err("no capacity".into())));

        let error = policy.initialize().unwrap_err();
        assert_eq!(error.to_string(), "no capacity");
    }

    #[test]
    fn debug_output_names_type() {
        let policy = FnPolicy::new(Box::new(|| Ok(vec![1_u8])));

        assert!(format!("{policy:?}").contains("FnPolicy"));
    }
}
