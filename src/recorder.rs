//! Boundary to the tracing recorder
//!
//! The recorder that owns segment trees, sampling and emission lives outside
//! this crate. Interceptors only need the narrow surface below: open a named
//! subsegment, attach key/value metadata, note an error, close the scope.

/// Trait for the trace recorder consumed by interceptors
///
/// Implementations must tolerate being called from any thread. A subsegment
/// opened with begin_subsegment() is always closed by exactly one matching
/// end_subsegment(), regardless of how the wrapped operation exits.
pub trait TraceRecorder: Send + Sync {
    /// Open a named subsegment for the current unit of work
    fn begin_subsegment(&self, name: &str);

    /// Tag the current subsegment with a namespace (e.g. "remote")
    fn set_namespace(&self, namespace: &str);

    /// Attach key/value metadata to the current subsegment
    fn add_metadata(&self, key: &str, value: &str);

    /// Record an error against the current subsegment
    fn add_error(&self, message: &str);

    /// Close the current subsegment
    fn end_subsegment(&self);
}

/// Recorder that drops everything
///
/// Used when tracing is disabled so instrumented call sites keep working
/// without a live recorder behind them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl TraceRecorder for NoopRecorder {
    fn begin_subsegment(&self, _name: &str) {}

    fn set_namespace(&self, _namespace: &str) {}

    fn add_metadata(&self, _key: &str, _value: &str) {}

    fn add_error(&self, _message: &str) {}

    fn end_subsegment(&self) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::TraceRecorder;
    use parking_lot::Mutex;

    /// Recorder that journals every call, for asserting interceptor behavior
    #[derive(Default)]
    pub struct RecordingRecorder {
        events: Mutex<Vec<String>>,
    }

    impl RecordingRecorder {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().push(event);
        }
    }

    impl TraceRecorder for RecordingRecorder {
        fn begin_subsegment(&self, name: &str) {
            self.push(format!("begin:{}", name));
        }

        fn set_namespace(&self, namespace: &str) {
            self.push(format!("namespace:{}", namespace));
        }

        fn add_metadata(&self, key: &str, value: &str) {
            self.push(format!("meta:{}={}", key, value));
        }

        fn add_error(&self, message: &str) {
            self.push(format!("error:{}", message));
        }

        fn end_subsegment(&self) {
            self.push("end".to_string());
        }
    }
}
