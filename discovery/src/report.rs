//! Structured reporting for binding attachment runs.

use serde::{Deserialize, Serialize};

/// Outcome of attaching bindings for a set of operators.
///
/// Warnings mirror the `warn!` events emitted during attachment, so callers
/// can inspect them without a tracing subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachReport {
    /// Operator names bound during this run, in attachment order.
    pub attached: Vec<String>,
    /// Names skipped because a binding already existed.
    pub duplicates: Vec<String>,
    /// Operators whose help text could not be fetched.
    pub failed: Vec<String>,
    /// Non-fatal warnings, one per failed operator or rejected call spec.
    pub warnings: Vec<String>,
}

impl AttachReport {
    /// One-line summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{} attached, {} duplicate, {} failed, {} warning(s)",
            self.attached.len(),
            self.duplicates.len(),
            self.failed.len(),
            self.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let report = AttachReport {
            attached: vec!["a".into(), "b".into()],
            failed: vec!["c".into()],
            warnings: vec!["could not attach operator 'c'".into()],
            ..AttachReport::default()
        };
        assert_eq!(
            report.summary(),
            "2 attached, 0 duplicate, 1 failed, 1 warning(s)"
        );
    }
}
