use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use nm::Event;
use tracing::{debug, trace};

use crate::callback::ListenerFn;
use crate::metrics::{CLEARS, EMIT_LISTENERS, EMITS, RELEASES, SUBSCRIPTIONS};
use crate::subscription::{RegistrationId, Release, double_release};
use crate::{Callback, Error, EventChannelBuilder, ListenerOutcome, Result, Subscription};

/// A typed, single-threaded event channel.
///
/// Listeners subscribe with a callback that receives `&A` and get back a [`Subscription`],
/// the single-use capability that unsubscribes them again. [`emit()`][Self::emit] notifies
/// every listener registered at the moment of the call, in registration order.
///
/// Use `()` as `A` for events without arguments and a tuple for events with several.
///
/// A channel is identified by reference: it cannot be cloned. Share it by reference or by
/// wrapping it in an [`Rc`].
///
/// # Reentrancy
///
/// Callbacks may emit, subscribe and destroy subscriptions on any channel, including the one
/// that is notifying them. Each emit pass works on a snapshot of the listener sequence taken
/// when the pass started:
///
/// * listeners added during the pass are first notified by the next pass;
/// * listeners removed during the pass are still notified by this pass if they were part of
///   the snapshot.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use event_channel::EventChannel;
///
/// let resized = EventChannel::<(u32, u32)>::with_label("resized");
/// let area = Rc::new(Cell::new(0));
///
/// let subscription = resized.subscribe({
///     let area = Rc::clone(&area);
///     move |(width, height): &(u32, u32)| area.set(width * height)
/// });
///
/// resized.emit((1920, 1080)).unwrap();
/// assert_eq!(area.get(), 1920 * 1080);
///
/// subscription.destroy().unwrap();
/// assert!(resized.is_empty());
/// ```
pub struct EventChannel<A = ()> {
    core: Rc<ChannelCore<A>>,
}

/// The shared state behind a channel. Subscriptions and once-listeners refer to it weakly.
struct ChannelCore<A> {
    label: Option<Rc<str>>,

    /// Active registrations in registration order, which is also the dispatch order.
    listeners: RefCell<Vec<Registration<A>>>,

    next_id: Cell<RegistrationId>,
}

struct Registration<A> {
    id: RegistrationId,
    function: Rc<ListenerFn<A>>,
}

impl<A> EventChannel<A>
where
    A: 'static,
{
    /// Creates a channel without a label.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let clicked = EventChannel::<()>::new();
    /// assert!(clicked.label().is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a channel with a label that identifies it in error messages and logs.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let clicked = EventChannel::<()>::with_label("clicked");
    /// assert_eq!(clicked.label(), Some("clicked"));
    /// ```
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self::builder().label(label).build()
    }

    /// Creates a builder for a channel with custom configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let progress = EventChannel::<f32>::builder()
    ///     .label("download_progress")
    ///     .capacity(16)
    ///     .build();
    ///
    /// assert_eq!(progress.label(), Some("download_progress"));
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn builder() -> EventChannelBuilder<A> {
        EventChannelBuilder::new()
    }

    pub(crate) fn from_parts(label: Option<String>, capacity: usize) -> Self {
        Self {
            core: Rc::new(ChannelCore {
                label: label.map(Rc::from),
                listeners: RefCell::new(Vec::with_capacity(capacity)),
                next_id: Cell::new(RegistrationId::FIRST),
            }),
        }
    }

    /// The diagnostic label of the channel, if it was given one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.core.label.as_deref()
    }

    /// The number of active registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.core.listeners.borrow().len()
    }

    /// Whether the channel has no active registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.listeners.borrow().is_empty()
    }

    /// Registers a callback that is invoked on every emit until its subscription is destroyed.
    ///
    /// The callback is appended to the end of the listener sequence.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let tick = EventChannel::<u64>::new();
    ///
    /// let subscription = tick.subscribe(|frame: &u64| println!("frame {frame}"));
    ///
    /// tick.emit(1).unwrap();
    /// tick.emit(2).unwrap();
    ///
    /// subscription.destroy().unwrap();
    /// assert!(subscription.destroy().is_err());
    /// ```
    pub fn subscribe<F, R>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) -> R + 'static,
        R: ListenerOutcome,
    {
        self.attach(Callback::new(callback))
    }

    /// Registers a callback that is invoked on the next emit only, after which the
    /// registration removes itself.
    ///
    /// The returned subscription can cancel the registration before it fires. After it has
    /// fired, destroying the subscription fails with [`Error::DoubleRelease`].
    ///
    /// If the callback returns an error, the error is returned from the emit that invoked it
    /// and the registration stays in place.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let loaded = EventChannel::<()>::new();
    ///
    /// let subscription = loaded.subscribe_once(|_: &()| println!("loaded"));
    ///
    /// loaded.emit(()).unwrap();
    /// assert!(loaded.is_empty());
    /// assert!(subscription.destroy().unwrap_err().is_double_release());
    /// ```
    pub fn subscribe_once<F, R>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) -> R + 'static,
        R: ListenerOutcome,
    {
        self.attach_once(Callback::new(callback))
    }

    /// Registers a callback received through a dynamically typed boundary.
    ///
    /// The value must be a [`Callback<A>`]. It is cloned, so the same value may be registered
    /// on several channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallback`] if the value is not a [`Callback<A>`]. Nothing is
    /// registered in that case.
    pub fn subscribe_dynamic(&self, callback: &dyn Any) -> Result<Subscription> {
        let callback = self.downcast_callback(callback)?;
        Ok(self.attach(callback))
    }

    /// Registers a once-callback received through a dynamically typed boundary.
    ///
    /// Behaves like [`subscribe_once()`][Self::subscribe_once] after the type check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCallback`] if the value is not a [`Callback<A>`]. Nothing is
    /// registered in that case.
    pub fn subscribe_once_dynamic(&self, callback: &dyn Any) -> Result<Subscription> {
        let callback = self.downcast_callback(callback)?;
        Ok(self.attach_once(callback))
    }

    /// Notifies every listener registered at the time of the call, in registration order.
    ///
    /// # Errors
    ///
    /// If a callback returns an error, that error is returned unchanged and the callbacks
    /// after it are not invoked by this pass. This includes the [`Error::DoubleRelease`] of a
    /// once-listener that was destroyed by its own callback.
    ///
    /// # Panics
    ///
    /// A panic in a callback unwinds through this method. The callbacks after it are not
    /// invoked and the channel remains usable.
    #[expect(
        clippy::needless_pass_by_value,
        reason = "the channel owns the arguments for the duration of the pass"
    )]
    pub fn emit(&self, args: A) -> Result<()> {
        // The borrow ends with this statement, so callbacks are free to mutate the sequence.
        let snapshot: Vec<Rc<ListenerFn<A>>> = self
            .core
            .listeners
            .borrow()
            .iter()
            .map(|registration| Rc::clone(&registration.function))
            .collect();

        EMITS.with(Event::observe_once);
        EMIT_LISTENERS.with(|e| e.observe(snapshot.len()));

        trace!(
            channel = self.core.label.as_deref(),
            listeners = snapshot.len(),
            "emitting event"
        );

        for function in snapshot {
            function(&args)?;
        }

        Ok(())
    }

    /// Removes every registration at once.
    ///
    /// Subscriptions issued for the removed registrations fail with [`Error::DoubleRelease`]
    /// if destroyed afterwards.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::EventChannel;
    ///
    /// let closed = EventChannel::<()>::new();
    /// let subscription = closed.subscribe(|_: &()| {});
    ///
    /// closed.clear();
    ///
    /// assert!(closed.is_empty());
    /// assert!(subscription.destroy().unwrap_err().is_double_release());
    /// ```
    pub fn clear(&self) {
        let removed = mem::take(&mut *self.core.listeners.borrow_mut());

        CLEARS.with(|e| e.observe(removed.len()));

        debug!(
            channel = self.core.label.as_deref(),
            removed = removed.len(),
            "cleared event channel"
        );

        // Dropped only now that the sequence is no longer borrowed, as the callbacks may own
        // state whose destructors touch this channel.
        drop(removed);
    }

    fn attach(&self, callback: Callback<A>) -> Subscription {
        let id = self.core.allocate_id();
        self.core.register(id, callback.into_function());

        trace!(channel = self.core.label.as_deref(), ?id, "subscribed listener");

        self.subscription(id)
    }

    fn attach_once(&self, callback: Callback<A>) -> Subscription {
        let id = self.core.allocate_id();
        let function = callback.into_function();

        // Weak, as the channel owns this closure and must not be kept alive by it.
        let core = Rc::downgrade(&self.core);
        let label = self.core.label.clone();

        let retiring = move |args: &A| -> Result<()> {
            function(args)?;

            let Some(core) = core.upgrade() else {
                return Err(double_release(label.as_deref()));
            };

            trace!(channel = label.as_deref(), ?id, "once-listener retiring");

            core.release(id)
        };

        self.core.register(id, Rc::new(retiring));

        trace!(channel = self.core.label.as_deref(), ?id, "subscribed once-listener");

        self.subscription(id)
    }

    fn subscription(&self, id: RegistrationId) -> Subscription {
        let core: Weak<ChannelCore<A>> = Rc::downgrade(&self.core);
        Subscription::new(core, id, self.core.label.clone())
    }

    fn downcast_callback(&self, callback: &dyn Any) -> Result<Callback<A>> {
        Callback::from_dynamic(callback, self.label())
    }
}

impl<A> ChannelCore<A> {
    fn allocate_id(&self) -> RegistrationId {
        let id = self.next_id.get();
        self.next_id.set(id.next());
        id
    }

    fn register(&self, id: RegistrationId, function: Rc<ListenerFn<A>>) {
        self.listeners
            .borrow_mut()
            .push(Registration { id, function });

        SUBSCRIPTIONS.with(Event::observe_once);
    }
}

impl<A> Release for ChannelCore<A> {
    fn release(&self, id: RegistrationId) -> Result<()> {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();

            let Some(index) = listeners
                .iter()
                .position(|registration| registration.id == id)
            else {
                return Err(double_release(self.label.as_deref()));
            };

            listeners.remove(index)
        };

        RELEASES.with(Event::observe_once);
        trace!(channel = self.label.as_deref(), ?id, "released listener");

        // Dropped outside the borrow, see `clear()`.
        drop(removed);

        Ok(())
    }

    fn is_registered(&self, id: RegistrationId) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|registration| registration.id == id)
    }
}

impl<A> Default for EventChannel<A>
where
    A: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for EventChannel<A> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("label", &self.core.label)
            .field("listeners", &self.core.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}
