use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::subscription::double_release;
use crate::{EventChannel, ListenerOutcome, Result, Subscription};

/// Subscribes one callback to every channel in `channels` such that it is invoked at most once
/// in total, by whichever channel emits first.
///
/// When one of the channels emits, the callback is invoked with the arguments of that emit,
/// after which the registrations on all the other channels are destroyed. The registration on
/// the channel that emitted retires by itself, like any once-listener.
///
/// The returned [`FirstSubscription`] cancels all registrations if destroyed before any channel
/// has emitted.
///
/// # Nested emits
///
/// The cohort is not protected against two of its channels firing in the same call stack
/// (the callback of the first trigger emitting another channel of the cohort). The nested
/// trigger invokes the callback a second time and tears down the cohort, after which the
/// teardown of the outer trigger fails with [`Error::DoubleRelease`][crate::Error::DoubleRelease],
/// returned from the outer `emit()`. Emit at most one channel of a cohort at a time.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use event_channel::{EventChannel, once_first};
///
/// let loaded = EventChannel::<()>::with_label("loaded");
/// let failed = EventChannel::<()>::with_label("failed");
/// let settled = Rc::new(Cell::new(0));
///
/// let subscription = once_first(
///     {
///         let settled = Rc::clone(&settled);
///         move |_: &()| settled.set(settled.get() + 1)
///     },
///     &[&loaded, &failed],
/// );
///
/// failed.emit(()).unwrap();
/// loaded.emit(()).unwrap();
///
/// assert_eq!(settled.get(), 1);
/// assert_eq!(subscription.triggered_by(), Some(1));
/// assert!(loaded.is_empty() && failed.is_empty());
/// ```
pub fn once_first<A, F, R>(callback: F, channels: &[&EventChannel<A>]) -> FirstSubscription
where
    A: 'static,
    F: Fn(&A) -> R + 'static,
    R: ListenerOutcome,
{
    let cohort = Rc::new(Cohort {
        subscriptions: RefCell::new(Vec::with_capacity(channels.len())),
        triggered_by: Cell::new(None),
        torn_down: Cell::new(false),
    });

    let callback = Rc::new(callback);

    for (index, channel) in channels.iter().enumerate() {
        let callback = Rc::clone(&callback);

        // Subscriptions only refer to their channels weakly, so this forms no cycle.
        let shared = Rc::clone(&cohort);

        let subscription = channel.subscribe_once(move |args: &A| -> Result<()> {
            let previous = shared.triggered_by.replace(Some(index));

            // A failed callback leaves its registration in place, so teardown must not skip it.
            if let Err(error) = callback(args).into_result() {
                shared.triggered_by.set(previous);
                return Err(error);
            }

            shared.tear_down()?;
            shared.torn_down.set(true);

            Ok(())
        });

        cohort.subscriptions.borrow_mut().push(subscription);
    }

    FirstSubscription { cohort }
}

/// The once-registrations made by one [`once_first()`] call and what happened to them.
struct Cohort {
    /// One per channel, in the order of the channels.
    subscriptions: RefCell<Vec<Subscription>>,

    /// Index of the channel whose registration fired most recently with a successful callback.
    triggered_by: Cell<Option<usize>>,

    /// Set once a trigger has completed its teardown of the other registrations.
    torn_down: Cell<bool>,
}

impl Cohort {
    /// Destroys every registration except the one that triggered, which retires by itself.
    fn tear_down(&self) -> Result<()> {
        let subscriptions = self.subscriptions.borrow();
        let triggered_by = self.triggered_by.get();

        if self.torn_down.get() {
            let label = triggered_by
                .and_then(|index| subscriptions.get(index))
                .and_then(Subscription::label);

            return Err(double_release(label));
        }

        for (index, subscription) in subscriptions.iter().enumerate() {
            if Some(index) != triggered_by {
                subscription.destroy()?;
            }
        }

        Ok(())
    }
}

/// The capability returned by [`once_first()`].
///
/// Destroying it before any of the channels has emitted removes the registrations from all
/// channels. Destroying it after a channel has emitted fails with
/// [`Error::DoubleRelease`][crate::Error::DoubleRelease], as the registrations are already gone.
#[must_use = "dropping a subscription keeps the listeners registered - call destroy() to unsubscribe"]
pub struct FirstSubscription {
    cohort: Rc<Cohort>,
}

impl FirstSubscription {
    /// Removes the registrations from every channel that has not emitted yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DoubleRelease`][crate::Error::DoubleRelease] if one of the channels
    /// already emitted and tore down the registrations, or if an underlying registration was
    /// removed by other means. In the latter case the remaining registrations stay in place.
    pub fn destroy(&self) -> Result<()> {
        self.cohort.tear_down()
    }

    /// Index (in the slice given to [`once_first()`]) of the channel that most recently
    /// triggered the callback, if any did.
    ///
    /// A trigger whose callback returned an error is not recorded.
    #[must_use]
    pub fn triggered_by(&self) -> Option<usize> {
        self.cohort.triggered_by.get()
    }

    /// Whether a channel has emitted and the registrations on the other channels have been
    /// torn down.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.cohort.torn_down.get()
    }
}

impl fmt::Debug for FirstSubscription {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstSubscription")
            .field("subscriptions", &self.cohort.subscriptions.borrow().len())
            .field("triggered_by", &self.cohort.triggered_by.get())
            .field("torn_down", &self.cohort.torn_down.get())
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::rc::Weak;

    use static_assertions::assert_not_impl_any;
    use testing::{CallCounter, with_watchdog};

    use super::*;
    use crate::Error;

    assert_not_impl_any!(FirstSubscription: Send, Sync, Clone);

    #[test]
    fn fires_once_on_first_channel() {
        with_watchdog(|| {
            let first = EventChannel::<u32>::new();
            let second = EventChannel::<u32>::new();
            let seen = Rc::new(RefCell::new(Vec::new()));

            let subscription = once_first(
                {
                    let seen = Rc::clone(&seen);
                    move |value: &u32| seen.borrow_mut().push(*value)
                },
                &[&first, &second],
            );

            assert!(!subscription.has_fired());
            assert_eq!(subscription.triggered_by(), None);

            second.emit(20).unwrap();
            first.emit(10).unwrap();
            second.emit(30).unwrap();

            assert_eq!(*seen.borrow(), vec![20]);
            assert!(subscription.has_fired());
            assert_eq!(subscription.triggered_by(), Some(1));
            assert!(first.is_empty());
            assert!(second.is_empty());
        });
    }

    #[test]
    fn early_destroy_removes_all() {
        with_watchdog(|| {
            let first = EventChannel::<()>::new();
            let second = EventChannel::<()>::new();
            let counter = CallCounter::new();

            let subscription = once_first(counter.listener(), &[&first, &second]);

            subscription.destroy().unwrap();
            assert!(first.is_empty());
            assert!(second.is_empty());

            first.emit(()).unwrap();
            assert_eq!(counter.count(), 0);
            assert!(!subscription.has_fired());

            // Early cancellation does not mark the cohort, the underlying capabilities do.
            assert!(subscription.destroy().unwrap_err().is_double_release());
        });
    }

    #[test]
    fn destroy_after_fire_is_double_release() {
        with_watchdog(|| {
            let first = EventChannel::<()>::new();
            let second = EventChannel::<()>::new();

            let subscription = once_first(|_: &()| {}, &[&first, &second]);

            first.emit(()).unwrap();

            let error = subscription.destroy().unwrap_err();
            assert!(error.is_double_release());
            assert!(error.to_string().contains("memory leak"));
        });
    }

    #[test]
    fn callback_error_leaves_cohort_in_place() {
        with_watchdog(|| {
            let first = EventChannel::<()>::new();
            let second = EventChannel::<()>::new();

            let subscription = once_first(
                |_: &()| -> Result<()> { Err(Error::listener("not ready")) },
                &[&first, &second],
            );

            assert!(first.emit(()).unwrap_err().is_listener());

            // No teardown happened and the triggering registration did not retire.
            assert_eq!(first.listener_count(), 1);
            assert_eq!(second.listener_count(), 1);
            assert!(!subscription.has_fired());
            assert_eq!(subscription.triggered_by(), None);

            // Cancelling now removes the registration whose callback failed, too.
            subscription.destroy().unwrap();
            assert!(first.is_empty());
            assert!(second.is_empty());
        });
    }

    #[test]
    fn later_trigger_after_failed_one_tears_down_everything() {
        with_watchdog(|| {
            let first = EventChannel::<bool>::new();
            let second = EventChannel::<bool>::new();

            let subscription = once_first(
                |ready: &bool| -> Result<()> {
                    if *ready {
                        Ok(())
                    } else {
                        Err(Error::listener("not ready"))
                    }
                },
                &[&first, &second],
            );

            assert!(first.emit(false).unwrap_err().is_listener());
            second.emit(true).unwrap();

            assert!(subscription.has_fired());
            assert_eq!(subscription.triggered_by(), Some(1));
            assert!(first.is_empty());
            assert!(second.is_empty());
        });
    }

    // Two channels of one cohort firing in the same call stack is a known hazard that is
    // deliberately left unhardened. This pins the current behavior: the callback runs for both
    // triggers and the outer teardown reports a double release.
    #[test]
    fn nested_trigger_is_double_release() {
        with_watchdog(|| {
            let first = Rc::new(EventChannel::<()>::with_label("outer"));
            let second = Rc::new(EventChannel::<()>::with_label("inner"));
            let counter = CallCounter::new();

            let second_ref: Weak<EventChannel<()>> = Rc::downgrade(&second);
            let nested_emit = counter.clone();

            let subscription = once_first(
                move |_: &()| -> Result<()> {
                    let first_call = nested_emit.count() == 0;
                    nested_emit.increment();

                    match second_ref.upgrade() {
                        Some(second) if first_call => second.emit(()),
                        _ => Ok(()),
                    }
                },
                &[&first, &second],
            );

            let error = first.emit(()).unwrap_err();

            assert!(error.is_double_release());
            assert_eq!(counter.count(), 2);
            assert_eq!(subscription.triggered_by(), Some(1));
            assert!(first.is_empty());
            assert!(second.is_empty());
        });
    }

    #[test]
    fn dropped_capability_keeps_listening() {
        with_watchdog(|| {
            let first = EventChannel::<()>::new();
            let second = EventChannel::<()>::new();
            let counter = CallCounter::new();

            drop(once_first(counter.listener(), &[&first, &second]));

            second.emit(()).unwrap();
            first.emit(()).unwrap();

            assert_eq!(counter.count(), 1);
            assert!(first.is_empty());
            assert!(second.is_empty());
        });
    }

    #[test]
    fn torn_down_error_names_triggering_channel() {
        with_watchdog(|| {
            let first = EventChannel::<()>::with_label("loaded");

            let subscription = once_first(|_: &()| {}, &[&first]);
            first.emit(()).unwrap();

            let error = subscription.destroy().unwrap_err();
            assert!(error.to_string().contains("'loaded'"));
        });
    }
}
