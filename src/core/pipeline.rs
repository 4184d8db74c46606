//! Phase isolation shared by both conversion directions
//!
//! A phase is a function from its input text to a new text. When it returns
//! an error or panics, the failure is logged, recorded as a
//! [`DiagnosticKind::PhaseFailure`] and the input is passed on unchanged.

use std::panic::{self, AssertUnwindSafe};

use crate::utils::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::utils::error::{ConversionError, ConversionResult};

/// Extract a readable message from a panic payload
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `f`, turning a panic into [`ConversionError::PhasePanicked`]
pub fn run_isolated<F>(phase: &'static str, f: F) -> ConversionResult<String>
where
    F: FnOnce() -> ConversionResult<String>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(ConversionError::PhasePanicked {
            phase,
            message: panic_message(payload),
        }),
    }
}

/// Take a phase result, falling back to `input` on failure
pub fn settle(
    phase: &'static str,
    input: String,
    result: ConversionResult<String>,
    diags: &mut Diagnostics,
) -> String {
    match result {
        Ok(output) => {
            log::debug!(
                "phase '{}': {} -> {} bytes",
                phase,
                input.len(),
                output.len()
            );
            output
        }
        Err(err) => {
            log::warn!("phase '{}' failed, passing input through: {}", phase, err);
            diags.add(
                Diagnostic::new(
                    DiagnosticKind::PhaseFailure,
                    format!("phase '{}' failed: {}", phase, err),
                    0,
                )
                .with_suggestion("the output of this phase is its unmodified input"),
            );
            input
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_passes_input_through() {
        let mut diags = Diagnostics::new();
        let result = run_isolated("demo", || Err(ConversionError::InvalidConfig("x".into())));
        let out = settle("demo", "input".to_string(), result, &mut diags);
        assert_eq!(out, "input");
        assert_eq!(diags.count_of(DiagnosticKind::PhaseFailure), 1);
    }

    #[test]
    fn test_panic_is_caught() {
        let mut diags = Diagnostics::new();
        let result = run_isolated("demo", || panic!("boom"));
        assert!(matches!(
            result,
            Err(ConversionError::PhasePanicked { phase: "demo", ref message }) if message == "boom"
        ));
        let out = settle("demo", "kept".to_string(), result, &mut diags);
        assert_eq!(out, "kept");
        assert!(diags.iter().any(|d| d.message.contains("boom")));
    }

    #[test]
    fn test_success() {
        let mut diags = Diagnostics::new();
        let result = run_isolated("demo", || Ok("new".to_string()));
        assert_eq!(settle("demo", "old".to_string(), result, &mut diags), "new");
        assert!(diags.is_empty());
    }
}
