#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in adaptive pool packages.

use std::panic;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

/// Runs a test with a timeout to prevent infinite hangs.
///
/// Pool tests spin up many threads that contend for the same lock. If a change introduces a
/// deadlock, the test fails after the timeout instead of hanging the build.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri, where thread
/// synchronization primitives are significantly slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled
/// and the test function is executed directly. This allows mutation testing to properly
/// detect hanging mutations.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode). A panic inside
/// the test function is propagated to the caller.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
#[cfg_attr(test, mutants::skip)] // The timeout branch only fires on a hang, which tests cannot afford.
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // If the receiver has already timed out, nobody is interested in the result.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_thread.join().expect("test thread sent its result, so it did not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout - possible deadlock");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without producing a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// A thread-safe, cloneable collection of log messages.
///
/// Hand [`sink()`](Self::sink) to a pool as its logger, then inspect what was logged.
///
/// # Example
///
/// ```rust
/// use testing::MessageLog;
///
/// let log = MessageLog::new();
/// let sink = log.sink();
///
/// sink("restored resource [0]");
///
/// assert_eq!(log.messages(), vec!["restored resource [0]".to_string()]);
/// assert_eq!(log.count_containing("restored"), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MessageLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MessageLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a logger function that appends every message to this log.
    #[must_use]
    pub fn sink(&self) -> impl Fn(&str) + Send + Sync + 'static {
        let messages = Arc::clone(&self.messages);

        move |message: &str| messages.lock().push(message.to_string())
    }

    /// Returns a copy of all messages logged so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Returns the number of logged messages that contain `fragment`.
    #[must_use]
    pub fn count_containing(&self, fragment: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.contains(fragment))
            .count()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_correct_value() {
        let result = with_watchdog(|| "hello world");
        assert_eq!(result, "hello world");
    }

    #[test]
    #[should_panic]
    fn watchdog_propagates_panic() {
        with_watchdog::<_, ()>(|| panic!("intentional panic"));
    }

    #[test]
    fn message_log_is_shared_between_clones() {
        let log = MessageLog::new();
        let clone = log.clone();

        let sink = clone.sink();
        sink("released resource [1]");
        sink("released resource [2]");
        sink("adaptive pool destroyed");

        assert_eq!(log.messages().len(), 3);
        assert_eq!(log.count_containing("released"), 2);
        assert_eq!(log.count_containing("restored"), 0);
    }
}
