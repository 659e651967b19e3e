use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs a test on a separate thread and fails it if it does not complete in time.
///
/// Listener callbacks are free to emit and subscribe reentrantly, which makes it easy for a
/// broken test or implementation to recurse or loop forever. This turns such a hang into a
/// test failure instead of a stuck CI job.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled and
/// the test function is executed directly, so that mutation testing can detect hanging mutants
/// with its own timeout.
///
/// The closure must be `Send`, so create single-threaded values such as channels inside it.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode).
///
/// Resumes the panic of the test thread if the test panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let doubled = with_watchdog(|| 21 * 2);
/// assert_eq!(doubled, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();

        // If this fails, the watchdog already gave up on us.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after reporting a result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout - likely runaway reentrant emission");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected without reporting a result"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}
