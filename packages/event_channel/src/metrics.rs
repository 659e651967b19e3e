//! Metrics collected by all event channels on the current thread.
//!
//! These show up in any `nm::Report` collected by the host process.

use nm::{Event, Magnitude};

/// Bucket boundaries for the number of listeners notified by a single emit pass.
const EMIT_LISTENERS_BUCKETS: &[Magnitude] = &[0, 1, 2, 4, 8, 16, 32, 64, 128];

thread_local! {
    pub(crate) static SUBSCRIPTIONS: Event = Event::builder()
        .name("event_channel_subscriptions")
        .build();

    pub(crate) static RELEASES: Event = Event::builder()
        .name("event_channel_releases")
        .build();

    pub(crate) static DOUBLE_RELEASES: Event = Event::builder()
        .name("event_channel_double_releases")
        .build();

    pub(crate) static EMITS: Event = Event::builder()
        .name("event_channel_emits")
        .build();

    pub(crate) static EMIT_LISTENERS: Event = Event::builder()
        .name("event_channel_emit_listeners")
        .histogram(EMIT_LISTENERS_BUCKETS)
        .build();

    pub(crate) static CLEARS: Event = Event::builder()
        .name("event_channel_clears")
        .build();
}
