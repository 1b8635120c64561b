//! Turning free-form generated text back into structured JSON records.
//!
//! [`extract_and_format`] runs four steps:
//!
//! 1. **Discovery**: find balanced JSON object/array literals in the text
//! 2. **Normalization**: flatten array candidates one level into values
//! 3. **Formatting**: decode each value, render it through the output
//!    template, and decode the rendered text again
//! 4. **Aggregation**: all-or-nothing; one failed value fails the batch
//!
//! Step 4 throws away values that formatted cleanly whenever a sibling
//! failed. Callers that need partial results have to call
//! [`format_value`] themselves.

pub mod discovery;
pub mod template;

use crate::error::{AggregatedError, ExtractError, ExtractionItemFailure, ExtractionStage};
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub use discovery::extract_values;
pub use template::{OutputTemplate, RenderTemplate};

/// Extract every JSON value embedded in `text` and reshape it with `template`.
///
/// Values come back in discovery order. Fails with
/// [`ExtractError::NoStructureFound`] when nothing JSON-shaped is present,
/// [`ExtractError::MalformedArray`] for a `[` literal that is not an array,
/// and [`ExtractError::Items`] when any single value fails.
#[instrument(level = "info", skip_all, fields(text_len = text.len()))]
pub fn extract_and_format<T>(text: &str, template: &T) -> Result<Vec<Value>, ExtractError>
where
    T: RenderTemplate + ?Sized,
{
    let literals = extract_values(text)?;
    debug!(values = literals.len(), "Extracted JSON values");

    let mut formatted = Vec::with_capacity(literals.len());
    let mut failures = AggregatedError::new();
    for (index, literal) in literals.into_iter().enumerate() {
        match format_value(literal, template) {
            Ok(value) => formatted.push(value),
            Err((stage, value, cause)) => failures.push(ExtractionItemFailure {
                index,
                value,
                stage,
                cause,
            }),
        }
    }

    if !failures.is_empty() {
        warn!(
            failed = failures.len(),
            discarded = formatted.len(),
            "Some values failed to format; discarding the batch"
        );
        return Err(ExtractError::Items(failures));
    }
    Ok(formatted)
}

/// Decode, render, and re-decode one literal.
///
/// On failure returns the stage, the text that failed at that stage, and the
/// cause.
pub fn format_value<T>(
    literal: &str,
    template: &T,
) -> Result<Value, (ExtractionStage, String, String)>
where
    T: RenderTemplate + ?Sized,
{
    let decoded: Value = serde_json::from_str(literal)
        .map_err(|e| (ExtractionStage::Decode, literal.to_string(), e.to_string()))?;

    let rendered = template
        .render(&decoded)
        .map_err(|e| (ExtractionStage::Render, literal.to_string(), e.to_string()))?;

    serde_json::from_str(&rendered).map_err(|e| (ExtractionStage::Redecode, rendered, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity_a() -> OutputTemplate {
        OutputTemplate::new(r#"{"a": {{ a }}}"#).unwrap()
    }

    fn heading_summary() -> OutputTemplate {
        OutputTemplate::new(r#"{"heading": {{ heading | tojson }}, "summary": {{ summary | tojson }}}"#)
            .unwrap()
    }

    #[test]
    fn test_single_object() {
        let out = extract_and_format("{\"a\":1}", &identity_a()).unwrap();
        assert_eq!(out, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_array_keeps_order() {
        let out = extract_and_format("[{\"a\":1},{\"a\":2}]", &identity_a()).unwrap();
        assert_eq!(out, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_multiple_separate_objects() {
        let input = r#"{"heading": "H1", "summary": "S1"} {"heading": "H2", "summary": "S2"}"#;
        let out = extract_and_format(input, &heading_summary()).unwrap();
        assert_eq!(
            out,
            vec![
                json!({"heading": "H1", "summary": "S1"}),
                json!({"heading": "H2", "summary": "S2"}),
            ]
        );
    }

    #[test]
    fn test_reshapes_nested_objects() {
        let tmpl =
            OutputTemplate::new(r#"{"title": {{ heading | tojson }}, "by": {{ details.author | tojson }}}"#)
                .unwrap();
        let input = r#"Here you go:
            [{"heading": "H1", "details": {"author": "A1"}}, {"heading": "H2", "details": {"author": "A2"}}]
            Hope that helps."#;

        let out = extract_and_format(input, &tmpl).unwrap();
        assert_eq!(
            out,
            vec![
                json!({"title": "H1", "by": "A1"}),
                json!({"title": "H2", "by": "A2"}),
            ]
        );
    }

    #[test]
    fn test_no_structure_found() {
        assert!(matches!(
            extract_and_format("no json here", &identity_a()),
            Err(ExtractError::NoStructureFound)
        ));
    }

    #[test]
    fn test_malformed_array() {
        assert!(matches!(
            extract_and_format("[not, valid]", &identity_a()),
            Err(ExtractError::MalformedArray { .. })
        ));
    }

    #[test]
    fn test_one_failed_render_discards_every_value() {
        let input = r#"[{"heading": "H1", "summary": "S1"}, {"heading": "H2"}]"#;

        let err = extract_and_format(input, &heading_summary()).unwrap_err();
        let failures = match err {
            ExtractError::Items(failures) => failures,
            other => panic!("expected item failures, got {other:?}"),
        };
        assert_eq!(failures.len(), 1);
        let failure = failures.iter().next().unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.stage, ExtractionStage::Render);
        assert_eq!(failure.value, r#"{"heading": "H2"}"#);
    }

    #[test]
    fn test_default_template_rejects_value_missing_a_field() {
        let input = r#"[{"heading":"H1","summary":"S1"},{"heading":"H2"}]"#;
        let template = OutputTemplate::default_output().unwrap();

        let err = extract_and_format(input, &template).unwrap_err();
        let failures = match err {
            ExtractError::Items(failures) => failures,
            other => panic!("expected item failures, got {other:?}"),
        };
        assert_eq!(failures.len(), 1);
        let failure = failures.iter().next().unwrap();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.stage, ExtractionStage::Render);
    }

    #[test]
    fn test_default_template_formats_clean_batch() {
        let input = r#"Summary: [{"heading":"H1","summary":"S1"},{"heading":"H2","summary":"S2"}]"#;
        let out = extract_and_format(input, &OutputTemplate::default_output().unwrap()).unwrap();
        assert_eq!(
            out,
            vec![
                json!({"heading": "H1", "summary": "S1"}),
                json!({"heading": "H2", "summary": "S2"}),
            ]
        );
    }

    #[test]
    fn test_undecodable_literal_is_an_item_failure() {
        let err = extract_and_format(r#"{"a": 1} {not json}"#, &identity_a()).unwrap_err();
        let failures = match err {
            ExtractError::Items(failures) => failures,
            other => panic!("expected item failures, got {other:?}"),
        };
        let failure = failures.iter().next().unwrap();
        assert_eq!(failure.stage, ExtractionStage::Decode);
        assert_eq!(failure.value, "{not json}");
    }

    #[test]
    fn test_template_producing_non_json_is_an_item_failure() {
        let tmpl = OutputTemplate::new("[{{ heading }}: {{ summary }}]").unwrap();
        let err = extract_and_format(r#"{"heading": "Test", "summary": "Summary"}"#, &tmpl)
            .unwrap_err();
        let failures = match err {
            ExtractError::Items(failures) => failures,
            other => panic!("expected item failures, got {other:?}"),
        };
        let failure = failures.iter().next().unwrap();
        assert_eq!(failure.stage, ExtractionStage::Redecode);
        assert_eq!(failure.value, "[Test: Summary]");
    }

    #[test]
    fn test_every_failure_is_collected() {
        let input = r#"[{"x": 1}, {"heading": "ok", "summary": "ok"}, {"y": 2}]"#;
        let err = extract_and_format(input, &heading_summary()).unwrap_err();
        let failures = match err {
            ExtractError::Items(failures) => failures,
            other => panic!("expected item failures, got {other:?}"),
        };
        let indexes: Vec<usize> = failures.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 2]);
    }

    #[test]
    fn test_format_value_directly() {
        let value = format_value(r#"{"a": [1, 2]}"#, &identity_a()).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }
}
