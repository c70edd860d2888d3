//! Error and warning collection for a single task run.
//!
//! Every message is forwarded to `tracing` as it is recorded, and kept so the
//! caller can decide success from "did anything log an error" once the whole
//! run has finished.

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.errors.push(message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_errors_and_warnings_separately() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());

        diagnostics.warning("directory is empty");
        assert!(!diagnostics.has_errors());

        diagnostics.error("No GUID for foo");
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.errors(), ["No GUID for foo"]);
        assert_eq!(diagnostics.warnings(), ["directory is empty"]);
    }
}
