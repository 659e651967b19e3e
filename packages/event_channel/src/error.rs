use std::error::Error as StdError;

use thiserror::Error;

/// Errors that can occur when subscribing to, emitting on or unsubscribing from event channels.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A callback supplied through a dynamically typed registration boundary was not a
    /// listener for the argument type of the channel.
    ///
    /// Statically typed registration cannot produce this error.
    #[error(
        "expected callback of {} to be a `Callback<{expected}>`, received a value of another type",
        describe(.channel.as_deref())
    )]
    InvalidCallback {
        /// Label of the channel the registration was attempted on, if it has one.
        channel: Option<String>,

        /// Name of the argument type the channel notifies its listeners with.
        expected: &'static str,
    },

    /// A destroyer was invoked for a registration that is no longer active. It was already
    /// destroyed, it was a once-listener that already fired, or its channel was cleared or
    /// dropped.
    ///
    /// This is a programming error akin to a double free: whoever owns the capability has lost
    /// track of its lifecycle, which often means listeners elsewhere are leaking.
    #[error(
        "called the destroyer of a listener on {} that was already destroyed, \
         this may indicate a memory leak",
        describe(.channel.as_deref())
    )]
    DoubleRelease {
        /// Label of the channel the registration belonged to, if it has one.
        channel: Option<String>,
    },

    /// A listener callback failed. The channel returns this error unchanged from `emit()`.
    #[error(transparent)]
    Listener(Box<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    /// Wraps the failure of a listener callback so it can be returned from the callback.
    ///
    /// # Example
    ///
    /// ```
    /// use event_channel::{Error, EventChannel};
    ///
    /// let channel = EventChannel::<u32>::new();
    ///
    /// let subscription = channel.subscribe(|value: &u32| {
    ///     if *value > 10 {
    ///         return Err(Error::listener(format!("value {value} is out of range")));
    ///     }
    ///
    ///     Ok(())
    /// });
    ///
    /// assert!(channel.emit(5).is_ok());
    /// assert!(channel.emit(50).unwrap_err().is_listener());
    /// # subscription.destroy().unwrap();
    /// ```
    pub fn listener(source: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Listener(source.into())
    }

    /// Whether this error signals a destroyer invoked on an inactive registration.
    #[must_use]
    pub fn is_double_release(&self) -> bool {
        matches!(self, Self::DoubleRelease { .. })
    }

    /// Whether this error signals a value that could not be registered as a callback.
    #[must_use]
    pub fn is_invalid_callback(&self) -> bool {
        matches!(self, Self::InvalidCallback { .. })
    }

    /// Whether this error was produced by a listener callback.
    #[must_use]
    pub fn is_listener(&self) -> bool {
        matches!(self, Self::Listener(_))
    }

    pub(crate) fn double_release(channel: Option<&str>) -> Self {
        Self::DoubleRelease {
            channel: channel.map(str::to_owned),
        }
    }
}

#[cfg_attr(test, mutants::skip)] // No API contract for error message.
fn describe(channel: Option<&str>) -> String {
    match channel {
        Some(label) => format!("event channel '{label}'"),
        None => "unlabeled event channel".to_owned(),
    }
}

/// A specialized `Result` type for event channel operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
