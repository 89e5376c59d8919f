//! Counters for commands and appended events.
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op. Exporters are the embedding application's choice.

use metrics::{counter, describe_counter};

/// Commands handled, labelled by `command` and `outcome`.
pub const COMMANDS_TOTAL: &str = "mise_commands_total";

/// Events appended by the command layer, labelled by `type`.
pub const EVENTS_APPENDED_TOTAL: &str = "mise_events_appended_total";

/// Outcome label for a command that appended its event.
pub const OUTCOME_OK: &str = "ok";

/// Registers metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        COMMANDS_TOTAL,
        "Total number of commands handled, by command and outcome"
    );
    describe_counter!(
        EVENTS_APPENDED_TOTAL,
        "Total number of events appended by the command layer, by event type"
    );
}

/// Counts one handled command.
pub fn record_command(command: impl Into<String>, outcome: &'static str) {
    counter!(COMMANDS_TOTAL, "command" => command.into(), "outcome" => outcome).increment(1);
}

/// Counts one appended event.
pub fn record_append(event_type: &'static str) {
    counter!(EVENTS_APPENDED_TOTAL, "type" => event_type).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use metrics::{
        Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
        with_local_recorder,
    };
    use std::sync::Mutex;

    /// Remembers described names and registered counter keys.
    #[derive(Default)]
    struct Capture {
        described: Mutex<Vec<String>>,
        counters: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl Recorder for Capture {
        fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, _description: SharedString) {
            self.described.lock().unwrap().push(key.as_str().to_string());
        }

        fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

        fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
            let labels = key
                .labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect();
            self.counters
                .lock()
                .unwrap()
                .push((key.name().to_string(), labels));
            Counter::noop()
        }

        fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn both_counters_are_described() {
        let capture = Capture::default();
        with_local_recorder(&capture, describe_metrics);
        assert_eq!(
            *capture.described.lock().unwrap(),
            vec![COMMANDS_TOTAL.to_string(), EVENTS_APPENDED_TOTAL.to_string()]
        );
    }

    #[test]
    fn counters_carry_their_labels() {
        let capture = Capture::default();
        with_local_recorder(&capture, || {
            record_command("confirm", OUTCOME_OK);
            record_append("OrderConfirmed.v1");
        });

        let counters = capture.counters.lock().unwrap();
        assert_eq!(
            counters[0],
            (
                COMMANDS_TOTAL.to_string(),
                vec![
                    ("command".to_string(), "confirm".to_string()),
                    ("outcome".to_string(), "ok".to_string()),
                ]
            )
        );
        assert_eq!(
            counters[1],
            (
                EVENTS_APPENDED_TOTAL.to_string(),
                vec![("type".to_string(), "OrderConfirmed.v1".to_string())]
            )
        );
    }
}
