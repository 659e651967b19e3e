use std::cell::Cell;
use std::rc::Rc;

/// Counts how many times a listener was invoked.
///
/// Clones share the same count, so a test can keep one clone for assertions and hand listeners
/// made from another clone to the code under test.
///
/// # Example
///
/// ```rust
/// use testing::CallCounter;
///
/// let counter = CallCounter::new();
/// let listener = counter.listener::<u32>();
///
/// listener(&1);
/// listener(&2);
///
/// assert_eq!(counter.count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallCounter {
    count: Rc<Cell<usize>>,
}

impl CallCounter {
    /// Creates a counter that starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of calls counted so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Counts one call.
    pub fn increment(&self) {
        self.count.set(self.count.get().wrapping_add(1));
    }

    /// Returns a listener function that ignores its arguments and counts each invocation.
    #[must_use]
    pub fn listener<A>(&self) -> impl Fn(&A) + use<A> {
        let counter = self.clone();
        move |_: &A| counter.increment()
    }
}
