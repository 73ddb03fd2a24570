//! Interception of outbound database calls
//!
//! Wraps a database operation in a named subsegment, records sanitized
//! connection metadata on success, records the error and re-raises it
//! unchanged on failure. The subsegment is closed exactly once on every exit
//! path, including panics, via a drop guard.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::config;
use crate::recorder::TraceRecorder;

pub mod sanitize;
pub mod sqlite;

/// Metadata describing one outbound database call
#[derive(Debug, Clone)]
pub struct SqlCommand {
    /// Driver / database type, e.g. "sqlite" or "postgres"
    pub driver: String,
    /// Logical database name
    pub database: String,
    /// Server the call goes to, possibly carrying a port ("host,1433")
    pub data_source: String,
    /// Server version string when the driver exposes one
    pub server_version: Option<String>,
    /// Raw connection string; credentials are stripped before recording
    pub connection_string: Option<String>,
    /// Statement text; only recorded when query collection is enabled
    pub statement: String,
}

impl SqlCommand {
    pub fn new(
        driver: impl Into<String>,
        database: impl Into<String>,
        data_source: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            driver: driver.into(),
            database: database.into(),
            data_source: data_source.into(),
            server_version: None,
            connection_string: None,
            statement: statement.into(),
        }
    }

    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }

    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Subsegment name: "{database}@{host}", port stripped from the host
    pub fn segment_name(&self) -> String {
        format!(
            "{}@{}",
            self.database,
            sanitize::strip_port(&self.data_source)
        )
    }
}

/// Closes the subsegment on drop, so every exit path ends it exactly once
struct SubsegmentGuard<'a> {
    recorder: &'a dyn TraceRecorder,
}

impl<'a> SubsegmentGuard<'a> {
    fn begin(recorder: &'a dyn TraceRecorder, name: &str) -> Self {
        recorder.begin_subsegment(name);
        Self { recorder }
    }
}

impl Drop for SubsegmentGuard<'_> {
    fn drop(&mut self) {
        self.recorder.end_subsegment();
    }
}

/// Interceptor wrapping database calls in trace subsegments
pub struct SqlInterceptor {
    recorder: Arc<dyn TraceRecorder>,
    collect_queries: Option<bool>,
}

impl SqlInterceptor {
    pub fn new(recorder: Arc<dyn TraceRecorder>) -> Self {
        Self {
            recorder,
            collect_queries: None,
        }
    }

    /// Override the global query-collection flag for this interceptor
    pub fn with_collect_queries(mut self, collect: bool) -> Self {
        self.collect_queries = Some(collect);
        self
    }

    /// Run a database operation inside a subsegment
    ///
    /// The wrapped error passes through unchanged; it is recorded on the
    /// subsegment but never swallowed or altered.
    pub fn intercept<T, E, F>(&self, command: &SqlCommand, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        let _guard = SubsegmentGuard::begin(self.recorder.as_ref(), &command.segment_name());
        self.recorder.set_namespace("remote");

        match op() {
            Ok(value) => {
                self.collect_sql_information(command);
                Ok(value)
            }
            Err(e) => {
                self.recorder.add_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Async variant of intercept() with the identical contract
    pub async fn intercept_async<T, E, F, Fut>(&self, command: &SqlCommand, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let _guard = SubsegmentGuard::begin(self.recorder.as_ref(), &command.segment_name());
        self.recorder.set_namespace("remote");

        match op().await {
            Ok(value) => {
                self.collect_sql_information(command);
                Ok(value)
            }
            Err(e) => {
                self.recorder.add_error(&e.to_string());
                Err(e)
            }
        }
    }

    fn collect_sql_information(&self, command: &SqlCommand) {
        self.recorder.add_metadata("database_type", &command.driver);

        if let Some(version) = &command.server_version {
            self.recorder.add_metadata("database_version", version);
        }

        if let Some(connection_string) = &command.connection_string {
            if let Some(user) = sanitize::extract_user(connection_string) {
                self.recorder.add_metadata("user", &user);
            }
            self.recorder.add_metadata(
                "connection_string",
                &sanitize::scrub_connection_string(connection_string),
            );
        }

        if self.should_collect_sql_text() {
            self.recorder.add_metadata("sanitized_query", &command.statement);
        }
    }

    fn should_collect_sql_text(&self) -> bool {
        self.collect_queries
            .unwrap_or_else(|| config::get_config().collect_sql_queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::testing::RecordingRecorder;

    fn command() -> SqlCommand {
        SqlCommand::new(
            "postgres",
            "trades",
            "db.example.com,5432",
            "SELECT mint, decimals FROM tokens",
        )
        .with_server_version("15.4")
        .with_connection_string("Server=db.example.com;User ID=bot;Password=hunter2")
    }

    #[test]
    fn test_success_records_sanitized_metadata() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone()).with_collect_queries(true);

        let result: Result<u32, String> = interceptor.intercept(&command(), || Ok(42));
        assert_eq!(result, Ok(42));

        let events = recorder.events();
        assert_eq!(events[0], "begin:trades@db.example.com");
        assert_eq!(events[1], "namespace:remote");
        assert!(events.contains(&"meta:database_type=postgres".to_string()));
        assert!(events.contains(&"meta:database_version=15.4".to_string()));
        assert!(events.contains(&"meta:user=bot".to_string()));
        assert!(events.contains(
            &"meta:connection_string=Server=db.example.com;User ID=bot".to_string()
        ));
        assert!(events
            .contains(&"meta:sanitized_query=SELECT mint, decimals FROM tokens".to_string()));
        assert_eq!(events.last().unwrap(), "end");
        assert_eq!(events.iter().filter(|e| *e == "end").count(), 1);
    }

    #[test]
    fn test_failure_records_error_and_reraises() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone()).with_collect_queries(true);

        let result: Result<u32, String> =
            interceptor.intercept(&command(), || Err("connection reset".to_string()));
        assert_eq!(result, Err("connection reset".to_string()));

        let events = recorder.events();
        assert!(events.contains(&"error:connection reset".to_string()));
        assert_eq!(events.last().unwrap(), "end");
        // No metadata on the failure path
        assert!(!events.iter().any(|e| e.starts_with("meta:")));
    }

    #[test]
    fn test_subsegment_closed_on_panic() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), String> =
                interceptor.intercept(&command(), || panic!("driver blew up"));
        }));
        assert!(outcome.is_err());

        let events = recorder.events();
        assert_eq!(events.iter().filter(|e| *e == "end").count(), 1);
        assert_eq!(events.last().unwrap(), "end");
    }

    #[test]
    fn test_query_collection_disabled_by_override() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone()).with_collect_queries(false);

        let result: Result<(), String> = interceptor.intercept(&command(), || Ok(()));
        assert!(result.is_ok());

        let events = recorder.events();
        assert!(!events.iter().any(|e| e.starts_with("meta:sanitized_query")));
        assert!(events.contains(&"meta:database_type=postgres".to_string()));
    }

    #[test]
    fn test_query_collection_defaults_to_global_config() {
        // Global default keeps query text out of the trace
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone());

        let result: Result<(), String> = interceptor.intercept(&command(), || Ok(()));
        assert!(result.is_ok());

        let events = recorder.events();
        assert!(!events.iter().any(|e| e.starts_with("meta:sanitized_query")));
    }

    #[tokio::test]
    async fn test_intercept_async_success() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone()).with_collect_queries(true);

        let result: Result<u32, String> = interceptor
            .intercept_async(&command(), || async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                Ok(7)
            })
            .await;
        assert_eq!(result, Ok(7));

        let events = recorder.events();
        assert_eq!(events[0], "begin:trades@db.example.com");
        assert_eq!(events.last().unwrap(), "end");
        assert!(events
            .contains(&"meta:sanitized_query=SELECT mint, decimals FROM tokens".to_string()));
    }

    #[tokio::test]
    async fn test_intercept_async_failure_reraises() {
        let recorder = Arc::new(RecordingRecorder::default());
        let interceptor = SqlInterceptor::new(recorder.clone());

        let result: Result<(), String> = interceptor
            .intercept_async(&command(), || async { Err("timeout".to_string()) })
            .await;
        assert_eq!(result, Err("timeout".to_string()));

        let events = recorder.events();
        assert!(events.contains(&"error:timeout".to_string()));
        assert_eq!(events.last().unwrap(), "end");
    }
}
