//! WASM bindings for mdlax
//!
//! This module provides JavaScript-accessible functions for both conversion
//! directions. Options are a plain object deserialized into
//! [`PipelineConfig`](crate::PipelineConfig); missing fields take defaults.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use serde::Serialize;

#[cfg(feature = "wasm")]
use crate::{transform, Diagnostic, Direction, PipelineConfig};

/// Conversion result with additional metadata
#[cfg(feature = "wasm")]
#[derive(Serialize)]
pub struct ConvertResult {
    /// The converted output
    pub output: String,
    /// Whether the options were accepted
    pub success: bool,
    /// Error message if the options were rejected
    pub error: Option<String>,
    /// Diagnostics collected during conversion
    pub diagnostics: Vec<Diagnostic>,
}

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[cfg(feature = "wasm")]
fn run(input: &str, options: JsValue, direction: Direction) -> JsValue {
    let config: Result<PipelineConfig, String> = if options.is_undefined() || options.is_null() {
        Ok(PipelineConfig::default())
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| e.to_string())
            .and_then(|c: PipelineConfig| c.validate().map(|_| c).map_err(|e| e.to_string()))
    };

    let result = match config {
        Ok(config) => {
            let (output, diagnostics) = transform(input, &config, direction).into_parts();
            ConvertResult {
                output,
                success: true,
                error: None,
                diagnostics,
            }
        }
        Err(message) => ConvertResult {
            output: String::new(),
            success: false,
            error: Some(format!("Invalid options: {}", message)),
            diagnostics: vec![],
        },
    };

    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Convert LaTeX-flavored markup to Markdown with math
///
/// # Arguments
/// * `input` - Source document
/// * `options` - Pipeline options object, or `undefined` for defaults
///
/// # Returns
/// `{ output, success, error, diagnostics }`
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "transformMarkdown")]
pub fn transform_markdown(input: &str, options: JsValue) -> JsValue {
    run(input, options, Direction::Forward)
}

/// Convert Markdown with math back to LaTeX
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "reverseMarkdown")]
pub fn reverse_markdown(input: &str, options: JsValue) -> JsValue {
    run(input, options, Direction::Reverse)
}
