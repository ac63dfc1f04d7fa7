//! Logging facilities for easel.
//!
//! easel uses the `tracing` crate for instrumentation. To see logs, install a
//! subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("easel=debug,easel_core=debug")
//!     .init();
//! ```
//!
//! State transitions of the host are logged at `info`, timer registration and
//! queue shutdown at `debug`, and every push, tick and draw at `trace`.

/// Span names used throughout easel for tracing.
pub mod span_names {
    /// Dispatch of one draw call to the UI thread.
    pub const DRAW: &str = "easel::draw";
    /// One UI session (window open to window closed).
    pub const SESSION: &str = "easel::session";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Event queue target.
    pub const QUEUE: &str = "easel_core::queue";
    /// Timer registry target.
    pub const TIMER: &str = "easel_core::timer";
    /// Native callback bridge target.
    pub const SINK: &str = "easel_core::sink";
    /// Window host target.
    pub const HOST: &str = "easel::host";
    /// Native backend target.
    pub const BACKEND: &str = "easel::backend";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to measure operations such as a draw round trip to the UI thread.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span for `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::trace_span!(target: "easel::perf", "perf", operation);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic without a subscriber.
        let _span = PerfSpan::new(span_names::DRAW);
    }
}
