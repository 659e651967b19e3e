#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Typed, single-threaded event channels with single-use unsubscribe capabilities.
//!
//! An [`EventChannel<A>`] lets independent parts of a program register interest in an
//! occurrence, be notified with arguments of type `A` when it happens and unregister again
//! deterministically. Delivery is synchronous: [`EventChannel::emit()`] calls every listener
//! on the calling thread before returning.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms for
//! high-performance hardware-aware programming in Rust.
//!
//! # Subscription lifecycle
//!
//! Every subscribe operation returns exactly one capability that removes the registration
//! again. The capability is single-use: destroying it a second time, or after the registration
//! went away by other means, fails with [`Error::DoubleRelease`]. Such a failure is a
//! programming error akin to a double free and usually means that the ownership of listeners
//! has been lost track of somewhere, so it is reported instead of being ignored.
//!
//! ```
//! use event_channel::EventChannel;
//!
//! let camera_moved = EventChannel::<(f32, f32)>::with_label("camera_moved");
//!
//! let subscription = camera_moved.subscribe(|(x, y): &(f32, f32)| {
//!     println!("camera is now at {x}, {y}");
//! });
//!
//! camera_moved.emit((1.0, 2.0)).unwrap();
//!
//! subscription.destroy().unwrap();
//! assert!(subscription.destroy().unwrap_err().is_double_release());
//! ```
//!
//! Once-listeners registered via [`EventChannel::subscribe_once()`] retire by themselves after
//! the first emit that reaches them.
//!
//! # Listening to several channels
//!
//! Two combinators operate over slices of channels with the same argument type:
//!
//! * [`on_any()`] invokes a callback whenever any of the channels emits and returns an
//!   [`AnySubscription`] that unsubscribes from all of them.
//! * [`once_first()`] invokes a callback only for the first emit on any of the channels, then
//!   tears down the registrations on the others. It returns a [`FirstSubscription`].
//!
//! ```
//! use event_channel::{EventChannel, once_first};
//!
//! let finished = EventChannel::<()>::with_label("animation_finished");
//! let interrupted = EventChannel::<()>::with_label("animation_interrupted");
//!
//! let subscription = once_first(|_: &()| println!("animation over"), &[&finished, &interrupted]);
//!
//! interrupted.emit(()).unwrap();
//!
//! // Nothing is left behind on either channel.
//! assert!(finished.is_empty() && interrupted.is_empty());
//! assert!(subscription.has_fired());
//! ```
//!
//! # Errors from listeners
//!
//! A callback may return `()` or [`Result<()>`]. An error returned by a callback is returned
//! unchanged from the `emit()` that invoked it, and the listeners after it are not invoked by
//! that emit. Use [`Error::listener()`] to wrap your own error types.
//!
//! # Reentrancy
//!
//! Callbacks may emit, subscribe and destroy subscriptions while being notified. Each emit
//! works on a snapshot of the listeners taken when it started, so listeners added during an
//! emit are first notified by the next one.
//!
//! # Thread safety
//!
//! All types in this package are single-threaded (`!Send` and `!Sync`).
//!
//! # Observability
//!
//! Channel operations are traced via the `tracing` crate at the `trace` and `debug` levels and
//! counted by `nm` events whose names start with `event_channel_`.

mod any;
mod callback;
mod channel;
mod channel_builder;
mod error;
mod first;
mod metrics;
mod subscription;

pub use any::*;
pub use callback::{Callback, ListenerOutcome};
pub use channel::*;
pub use channel_builder::*;
pub use error::*;
pub use first::*;
pub use subscription::Subscription;

trait Sealed {}
