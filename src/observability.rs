use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("infrachat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("infrachat.client.request_errors");
pub(crate) static CLIENT_STATUS_ERRORS: Counter = Counter::new("infrachat.client.status_errors");

pub(crate) static STREAM_LINES: Counter = Counter::new("infrachat.stream.lines");
pub(crate) static STREAM_BYTES: Counter = Counter::new("infrachat.stream.bytes");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("infrachat.stream.chunks");
pub(crate) static STREAM_DROPPED_FRAGMENTS: Counter =
    Counter::new("infrachat.stream.dropped_fragments");
pub(crate) static STREAM_IGNORED_CHUNKS: Counter = Counter::new("infrachat.stream.ignored_chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("infrachat.stream.errors");
pub(crate) static STREAM_DURATION: Moments = Moments::new("infrachat.stream.duration_seconds");

pub(crate) static SESSION_THREAD_CHANGES: Counter =
    Counter::new("infrachat.session.thread_changes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_STATUS_ERRORS);

    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_DROPPED_FRAGMENTS);
    collector.register_counter(&STREAM_IGNORED_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_THREAD_CHANGES);
}
