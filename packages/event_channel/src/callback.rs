use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

use crate::{Error, Result, Sealed};

/// What a listener callback may return: either `()` for callbacks that cannot fail, or
/// [`Result<()>`][crate::Result] for callbacks that can.
///
/// An error returned by a callback aborts the emit pass that invoked it and is returned
/// unchanged to whoever called [`emit()`][crate::EventChannel::emit].
#[expect(private_bounds, reason = "intentional - sealed trait")]
pub trait ListenerOutcome: Sealed {
    /// Converts the callback return value into the form the channel dispatches on.
    fn into_result(self) -> Result<()>;
}

impl Sealed for () {}

impl ListenerOutcome for () {
    #[inline]
    fn into_result(self) -> Result<()> {
        Ok(())
    }
}

impl Sealed for Result<()> {}

impl ListenerOutcome for Result<()> {
    #[inline]
    fn into_result(self) -> Result<()> {
        self
    }
}

/// The function shape every registration stores, regardless of how it was registered.
pub(crate) type ListenerFn<A> = dyn Fn(&A) -> Result<()>;

/// A cloneable, type-erased handle to a listener function for channels with argument type `A`.
///
/// You only need this type when registering through a dynamically typed boundary, such as
/// [`EventChannel::subscribe_dynamic()`][crate::EventChannel::subscribe_dynamic], where the
/// callback travels as a `&dyn Any`. Statically typed code passes closures directly to
/// [`EventChannel::subscribe()`][crate::EventChannel::subscribe].
///
/// Clones share the same function.
///
/// # Example
///
/// ```
/// use std::any::Any;
///
/// use event_channel::{Callback, EventChannel};
///
/// let channel = EventChannel::<String>::with_label("greeting");
///
/// let callback: Box<dyn Any> = Box::new(Callback::new(|name: &String| {
///     println!("Hello, {name}!");
/// }));
///
/// let subscription = channel.subscribe_dynamic(callback.as_ref()).unwrap();
/// channel.emit("world".to_owned()).unwrap();
/// subscription.destroy().unwrap();
/// ```
pub struct Callback<A> {
    function: Rc<ListenerFn<A>>,
}

impl<A> Callback<A> {
    /// Wraps a listener function.
    #[must_use]
    pub fn new<F, R>(function: F) -> Self
    where
        F: Fn(&A) -> R + 'static,
        R: ListenerOutcome,
    {
        Self {
            function: Rc::new(move |args: &A| function(args).into_result()),
        }
    }

    pub(crate) fn into_function(self) -> Rc<ListenerFn<A>> {
        self.function
    }
}

impl<A> Callback<A>
where
    A: 'static,
{
    /// Recovers a callback from a dynamically typed value, naming `channel` in the error if the
    /// value is of another type.
    pub(crate) fn from_dynamic(value: &dyn Any, channel: Option<&str>) -> Result<Self> {
        value
            .downcast_ref::<Self>()
            .cloned()
            .ok_or_else(|| Error::InvalidCallback {
                channel: channel.map(str::to_owned),
                expected: type_name::<A>(),
            })
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            function: Rc::clone(&self.function),
        }
    }
}

impl<A> fmt::Debug for Callback<A> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("args", &type_name::<A>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_not_impl_any;

    use super::*;

    assert_not_impl_any!(Callback<u32>: Send, Sync);

    #[test]
    fn infallible_callback_succeeds() {
        let callback = Callback::new(|_: &u32| {});

        (callback.into_function())(&1).unwrap();
    }

    #[test]
    fn fallible_callback_error_is_kept() {
        let callback = Callback::new(|value: &u32| -> Result<()> {
            Err(Error::listener(format!("rejected {value}")))
        });

        let error = (callback.into_function())(&7).unwrap_err();
        assert!(error.is_listener());
        assert_eq!(error.to_string(), "rejected 7");
    }

    #[test]
    fn from_dynamic_accepts_matching_callback() {
        let callback: Box<dyn Any> = Box::new(Callback::new(|_: &u32| {}));

        Callback::<u32>::from_dynamic(callback.as_ref(), None).unwrap();
    }

    #[test]
    fn from_dynamic_rejects_other_types() {
        let callback: Box<dyn Any> = Box::new(Callback::new(|_: &u64| {}));

        let error = Callback::<u32>::from_dynamic(callback.as_ref(), Some("typed")).unwrap_err();

        assert!(error.is_invalid_callback());
        assert!(error.to_string().contains("'typed'"));
    }

    #[test]
    fn clones_share_function() {
        let callback = Callback::new(|_: &()| {});
        let clone = callback.clone();

        assert!(Rc::ptr_eq(&callback.into_function(), &clone.into_function()));
    }
}
