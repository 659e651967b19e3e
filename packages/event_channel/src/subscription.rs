use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use nm::Event;

use crate::metrics::DOUBLE_RELEASES;
use crate::{Error, Result};

/// Identifies one registration within the listener sequence of one channel.
///
/// Identifiers are never reused by a channel, so a stale identifier can never match a newer
/// registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) const FIRST: Self = Self(0);

    #[must_use]
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// The removal path shared by destroyers and self-retiring once-listeners.
///
/// Implemented by the channel core so that destroyers can refer to a channel without knowing
/// its argument type.
pub(crate) trait Release {
    /// Removes the registration, failing with [`Error::DoubleRelease`] if it is not present.
    fn release(&self, id: RegistrationId) -> Result<()>;

    fn is_registered(&self, id: RegistrationId) -> bool;
}

/// Creates the error for a removal attempt on an inactive registration, recording it in the
/// `event_channel_double_releases` metric.
pub(crate) fn double_release(channel: Option<&str>) -> Error {
    DOUBLE_RELEASES.with(Event::observe_once);
    Error::double_release(channel)
}

/// The single-use capability that removes one listener registration from its channel.
///
/// Every subscribe operation on an [`EventChannel`][crate::EventChannel] returns one of these.
/// Call [`destroy()`][Self::destroy] exactly once to unsubscribe. Calling it again, or calling
/// it after the registration went away by other means (a once-listener that already fired,
/// a cleared or dropped channel), fails with [`Error::DoubleRelease`].
///
/// Dropping a subscription does not unsubscribe. The listener stays registered until the
/// channel is cleared or dropped.
///
/// A subscription only holds a weak reference to its channel and does not keep it alive.
#[must_use = "dropping a subscription keeps the listener registered - call destroy() to unsubscribe"]
pub struct Subscription {
    channel: Weak<dyn Release>,
    id: RegistrationId,
    label: Option<Rc<str>>,

    // Set on the first successful destroy. Checked before touching the channel at all.
    consumed: Cell<bool>,
}

impl Subscription {
    pub(crate) fn new(
        channel: Weak<dyn Release>,
        id: RegistrationId,
        label: Option<Rc<str>>,
    ) -> Self {
        Self {
            channel,
            id,
            label,
            consumed: Cell::new(false),
        }
    }

    /// Removes the registration from its channel.
    ///
    /// A listener that is part of an emit pass already in progress is still invoked by that
    /// pass. It is not invoked by any later pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DoubleRelease`] if this subscription was already destroyed or the
    /// registration is no longer present in the channel.
    pub fn destroy(&self) -> Result<()> {
        if self.consumed.get() {
            return Err(double_release(self.label.as_deref()));
        }

        let Some(channel) = self.channel.upgrade() else {
            return Err(double_release(self.label.as_deref()));
        };

        channel.release(self.id)?;
        self.consumed.set(true);

        Ok(())
    }

    pub(crate) fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether [`destroy()`][Self::destroy] has already succeeded on this subscription.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }

    /// Whether the registration is still present in its channel, meaning that a call to
    /// [`destroy()`][Self::destroy] would succeed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.consumed.get()
            && self
                .channel
                .upgrade()
                .is_some_and(|channel| channel.is_registered(self.id))
    }
}

impl fmt::Debug for Subscription {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("consumed", &self.consumed.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;

    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(Subscription: Send, Sync, Clone);

    /// Stand-in for a channel that only tracks which registrations exist.
    #[derive(Debug, Default)]
    struct FakeChannel {
        registered: RefCell<Vec<RegistrationId>>,
    }

    impl Release for FakeChannel {
        fn release(&self, id: RegistrationId) -> Result<()> {
            let mut registered = self.registered.borrow_mut();

            let index = registered
                .iter()
                .position(|candidate| *candidate == id)
                .ok_or_else(|| Error::double_release(None))?;

            registered.remove(index);
            Ok(())
        }

        fn is_registered(&self, id: RegistrationId) -> bool {
            self.registered.borrow().contains(&id)
        }
    }

    fn subscription_on(channel: &Rc<FakeChannel>, id: RegistrationId) -> Subscription {
        channel.registered.borrow_mut().push(id);

        let weak: Weak<FakeChannel> = Rc::downgrade(channel);
        Subscription::new(weak, id, Some(Rc::from("fake")))
    }

    #[test]
    fn destroy_consumes() {
        let channel = Rc::new(FakeChannel::default());
        let subscription = subscription_on(&channel, RegistrationId::FIRST);

        assert!(subscription.is_active());
        assert!(!subscription.is_consumed());

        subscription.destroy().unwrap();

        assert!(subscription.is_consumed());
        assert!(!subscription.is_active());
        assert!(channel.registered.borrow().is_empty());
    }

    #[test]
    fn second_destroy_fails_without_touching_channel() {
        let channel = Rc::new(FakeChannel::default());
        let subscription = subscription_on(&channel, RegistrationId::FIRST);

        subscription.destroy().unwrap();

        // Even if the same identifier somehow reappeared, the consumed flag wins.
        channel.registered.borrow_mut().push(RegistrationId::FIRST);

        let error = subscription.destroy().unwrap_err();
        assert!(error.is_double_release());
        assert_eq!(channel.registered.borrow().len(), 1);
    }

    #[test]
    fn destroy_after_removal_elsewhere_fails() {
        let channel = Rc::new(FakeChannel::default());
        let subscription = subscription_on(&channel, RegistrationId::FIRST);

        channel.registered.borrow_mut().clear();

        assert!(!subscription.is_active());
        assert!(subscription.destroy().unwrap_err().is_double_release());
        assert!(!subscription.is_consumed());
    }

    #[test]
    fn destroy_after_channel_dropped_fails() {
        let channel = Rc::new(FakeChannel::default());
        let subscription = subscription_on(&channel, RegistrationId::FIRST);

        drop(channel);

        assert!(!subscription.is_active());
        assert!(subscription.destroy().unwrap_err().is_double_release());
    }

    #[test]
    fn registration_ids_are_distinct() {
        let first = RegistrationId::FIRST;
        let second = first.next();

        assert_ne!(first, second);
        assert_ne!(second, second.next());
    }
}
