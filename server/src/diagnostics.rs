//! Diagnostics sink for the authentication gateway.
//!
//! The loader and the middleware report operational events through this
//! trait instead of calling `tracing` macros directly, so tests can assert
//! on emitted diagnostics without capturing global logger output. The
//! production implementation forwards to `tracing`.

/// Structured diagnostics emitted by the gateway.
///
/// Implementations must be cheap to call; the middleware invokes them on
/// every rejected request.
pub trait Diagnostics: Send + Sync {
    /// Routine operational information.
    fn info(&self, message: &str);
    /// A condition an operator should notice, such as a rejected request
    /// or anonymous access being enabled.
    fn warn(&self, message: &str);
    /// An unexpected internal failure.
    fn error(&self, message: &str);
}

/// Diagnostics implementation backed by `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDiagnostics;

    #[test]
    fn test_recording_diagnostics_captures_messages() {
        let diagnostics = RecordingDiagnostics::new();
        diagnostics.info("loading");
        diagnostics.warn("watch out");
        diagnostics.error("broken");

        assert_eq!(diagnostics.infos(), vec!["loading".to_string()]);
        assert_eq!(diagnostics.warnings(), vec!["watch out".to_string()]);
        assert_eq!(diagnostics.errors(), vec!["broken".to_string()]);
    }

    #[test]
    fn test_tracing_diagnostics_is_callable() {
        // Forwarding only; nothing to assert beyond not panicking.
        let diagnostics = TracingDiagnostics;
        diagnostics.info("info");
        diagnostics.warn("warn");
        diagnostics.error("error");
    }
}
