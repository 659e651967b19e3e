use std::marker::PhantomData;

use crate::EventChannel;

/// Creates instances of [`EventChannel`].
///
/// There are no required parameters. Use `EventChannel::builder()` to create a new instance of
/// this builder.
#[derive(Debug)]
pub struct EventChannelBuilder<A> {
    /// Identifies the channel in error messages and logs. Has no effect on behavior.
    label: Option<String>,

    /// How many registrations to reserve room for up front.
    capacity: usize,

    _args: PhantomData<fn(&A)>,
}

impl<A> EventChannelBuilder<A>
where
    A: 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            label: None,
            capacity: 0,
            _args: PhantomData,
        }
    }

    /// Sets the diagnostic label of the channel.
    ///
    /// Recommended format: `noun_past_tense_verb`, for example `camera_moved`.
    #[must_use]
    pub fn label(self, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }

    /// Reserves room for the given number of registrations, so that the listener sequence
    /// does not reallocate until more than this many listeners are active at once.
    ///
    /// The default is to reserve nothing.
    #[must_use]
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Builds the channel with the current configuration.
    #[must_use]
    pub fn build(self) -> EventChannel<A> {
        EventChannel::from_parts(self.label, self.capacity)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_unlabeled() {
        let channel = EventChannelBuilder::<u8>::new().build();

        assert!(channel.label().is_none());
        assert!(channel.is_empty());
    }

    #[test]
    fn label_and_capacity_are_applied() {
        let channel = EventChannel::<u8>::builder()
            .capacity(4)
            .label("zoomed")
            .build();

        assert_eq!(channel.label(), Some("zoomed"));
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn last_label_wins() {
        let channel = EventChannel::<u8>::builder()
            .label("first")
            .label("second")
            .build();

        assert_eq!(channel.label(), Some("second"));
    }
}
