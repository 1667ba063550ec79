//! Operational alerting for the upload pipeline.
//!
//! Components receive an [`AlertSink`] by constructor injection; there is no
//! process-wide default alerter. The [`TracingAlertSink`] routes alerts into
//! the logging pipeline and is the sink of choice when no external alerting
//! system is wired up.

use std::sync::Arc;

use tracing::warn;

/// Receives operational alerts raised by the upload pipeline.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert message.
    fn notify(&self, message: &str);
}

/// Alert sink that emits alerts as warnings through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn notify(&self, message: &str) {
        warn!(alert = message, "Upload alert raised");
    }
}

impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    fn notify(&self, message: &str) {
        (**self).notify(message);
    }
}

/// Test-only sink that records every alert, shared across the crate's test
/// modules.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::AlertSink;

    #[derive(Default)]
    pub(crate) struct CollectingAlertSink {
        messages: Mutex<Vec<String>>,
    }

    impl CollectingAlertSink {
        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl AlertSink for CollectingAlertSink {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
