use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("colloquy.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("colloquy.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("colloquy.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("colloquy.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("colloquy.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("colloquy.stream.bytes");

pub(crate) static EXCHANGES: Counter = Counter::new("colloquy.exchange.completed");
pub(crate) static EXCHANGE_FAILURES: Counter = Counter::new("colloquy.exchange.failed");
pub(crate) static EXCHANGE_FRAGMENTS: Counter = Counter::new("colloquy.exchange.fragments");
pub(crate) static EXCHANGE_FIRST_FRAGMENT: Moments =
    Moments::new("colloquy.exchange.first_fragment_seconds");
pub(crate) static EXCHANGE_DURATION: Moments =
    Moments::new("colloquy.exchange.duration_seconds");

pub(crate) static SESSION_RESETS: Counter = Counter::new("colloquy.session.resets");
pub(crate) static EDITOR_INVOCATIONS: Counter = Counter::new("colloquy.editor.invocations");
pub(crate) static EDITOR_FAILURES: Counter = Counter::new("colloquy.editor.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&EXCHANGES);
    collector.register_counter(&EXCHANGE_FAILURES);
    collector.register_counter(&EXCHANGE_FRAGMENTS);
    collector.register_moments(&EXCHANGE_FIRST_FRAGMENT);
    collector.register_moments(&EXCHANGE_DURATION);

    collector.register_counter(&SESSION_RESETS);
    collector.register_counter(&EDITOR_INVOCATIONS);
    collector.register_counter(&EDITOR_FAILURES);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_with_fresh_collector() {
        register_biometrics(Collector::new());
    }
}
