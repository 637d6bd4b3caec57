use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("promptsmith.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("promptsmith.client.request_errors");
pub(crate) static CLIENT_EMPTY_RESPONSES: Counter =
    Counter::new("promptsmith.client.empty_responses");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("promptsmith.client.request_duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("promptsmith.session.turns");
pub(crate) static SESSION_TURN_FAILURES: Counter =
    Counter::new("promptsmith.session.turn_failures");
pub(crate) static SESSION_REJECTED_INPUTS: Counter =
    Counter::new("promptsmith.session.rejected_inputs");
pub(crate) static SESSION_RESETS: Counter = Counter::new("promptsmith.session.resets");
pub(crate) static SESSION_TEMPLATED_PROMPTS: Counter =
    Counter::new("promptsmith.session.templated_prompts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_EMPTY_RESPONSES);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_FAILURES);
    collector.register_counter(&SESSION_REJECTED_INPUTS);
    collector.register_counter(&SESSION_RESETS);
    collector.register_counter(&SESSION_TEMPLATED_PROMPTS);
}
