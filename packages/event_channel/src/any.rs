use std::any::Any;
use std::rc::Rc;

use crate::{Callback, EventChannel, ListenerOutcome, Result, Subscription};

/// Subscribes one callback to every channel in `channels`, in order, returning a single
/// capability that unsubscribes it from all of them.
///
/// The callback is invoked on every emit of every channel until the returned
/// [`AnySubscription`] is destroyed.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use event_channel::{EventChannel, on_any};
///
/// let zoomed = EventChannel::<()>::with_label("zoomed");
/// let panned = EventChannel::<()>::with_label("panned");
/// let redraws = Rc::new(Cell::new(0));
///
/// let subscription = on_any(
///     {
///         let redraws = Rc::clone(&redraws);
///         move |_: &()| redraws.set(redraws.get() + 1)
///     },
///     &[&zoomed, &panned],
/// );
///
/// zoomed.emit(()).unwrap();
/// panned.emit(()).unwrap();
/// assert_eq!(redraws.get(), 2);
///
/// subscription.destroy().unwrap();
/// assert!(zoomed.is_empty() && panned.is_empty());
/// ```
pub fn on_any<A, F, R>(callback: F, channels: &[&EventChannel<A>]) -> AnySubscription
where
    A: 'static,
    F: Fn(&A) -> R + 'static,
    R: ListenerOutcome,
{
    let callback = Rc::new(callback);

    let subscriptions = channels
        .iter()
        .map(|channel| {
            let callback = Rc::clone(&callback);
            channel.subscribe(move |args: &A| callback(args))
        })
        .collect();

    AnySubscription { subscriptions }
}

/// Subscribes a callback received through a dynamically typed boundary to every channel in
/// `channels`, in order.
///
/// The value must be a [`Callback<A>`]. Since all the channels share the argument type, the
/// value is checked once before anything is registered.
///
/// # Errors
///
/// Returns [`Error::InvalidCallback`][crate::Error::InvalidCallback] naming the first channel
/// if the value is not a [`Callback<A>`]. No channel is subscribed in that case.
pub fn on_any_dynamic<A>(
    callback: &dyn Any,
    channels: &[&EventChannel<A>],
) -> Result<AnySubscription>
where
    A: 'static,
{
    let label = channels.first().and_then(|channel| channel.label());
    let function = Callback::<A>::from_dynamic(callback, label)?.into_function();

    Ok(on_any(move |args: &A| function(args), channels))
}

/// The capability returned by [`on_any()`] that unsubscribes the callback from every channel.
///
/// Destroying it destroys the underlying per-channel [`Subscription`]s in the order they were
/// made. Do not mix this with unsubscribing from individual channels by other means (such as
/// clearing one of the channels): the first underlying [`Error::DoubleRelease`][1] stops the
/// teardown and leaves the remaining channels subscribed. For the same reason, destroying this
/// twice fails.
///
/// [1]: crate::Error::DoubleRelease
#[derive(Debug)]
#[must_use = "dropping a subscription keeps the listeners registered - call destroy() to unsubscribe"]
pub struct AnySubscription {
    subscriptions: Vec<Subscription>,
}

impl AnySubscription {
    /// Unsubscribes the callback from every channel.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::DoubleRelease`][crate::Error::DoubleRelease] reported by an
    /// underlying subscription. Subscriptions after it are left untouched.
    pub fn destroy(&self) -> Result<()> {
        for subscription in &self.subscriptions {
            subscription.destroy()?;
        }

        Ok(())
    }

    /// The number of channels the callback was subscribed to.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the callback was subscribed to no channels at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
