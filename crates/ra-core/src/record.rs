//! The research record and the interpreter that builds it from model text.
//!
//! Interpretation is two stages. [`strict_parse`] accepts only a JSON object
//! carrying all four fields with the right shapes. When that fails,
//! [`repair`] decodes the text again and fills in the two optional
//! collections (`sources`, `tools_used`) with empty lists if, and only if,
//! their keys are absent. Nothing else is ever invented: a record without a
//! `topic` or `summary` cannot be built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Keys that may be absent from model output and default to an empty list.
pub const OPTIONAL_COLLECTIONS: [&str; 2] = ["sources", "tools_used"];

/// The structured answer the model is asked to produce.
///
/// Built once from one model response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRecord {
    topic: String,
    summary: String,
    sources: Vec<String>,
    tools_used: Vec<String>,
}

impl ResearchRecord {
    pub fn new(
        topic: impl Into<String>,
        summary: impl Into<String>,
        sources: Vec<String>,
        tools_used: Vec<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            summary: summary.into(),
            sources,
            tools_used,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn tools_used(&self) -> &[String] {
        &self.tools_used
    }
}

impl std::fmt::Display for ResearchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list(items: &[String]) -> String {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(", ")
            }
        }

        writeln!(f, "Topic: {}", self.topic)?;
        writeln!(f, "Summary: {}", self.summary)?;
        writeln!(f, "Sources: {}", list(&self.sources))?;
        write!(f, "Tools used: {}", list(&self.tools_used))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Decode(String),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("invalid research record: {0}")]
    Invalid(String),
}

/// Both stages failed; carries each stage's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{repair} (strict parse: {strict})")]
pub struct InterpretError {
    pub strict: ParseError,
    pub repair: ParseError,
}

/// How a record was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePath {
    Strict,
    Repaired { strict_error: ParseError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreted {
    pub record: ResearchRecord,
    pub path: ParsePath,
}

impl Interpreted {
    pub fn was_repaired(&self) -> bool {
        matches!(self.path, ParsePath::Repaired { .. })
    }
}

fn decode_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ParseError::Decode(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ParseError::NotAnObject("null")),
        Value::Bool(_) => Err(ParseError::NotAnObject("a boolean")),
        Value::Number(_) => Err(ParseError::NotAnObject("a number")),
        Value::String(_) => Err(ParseError::NotAnObject("a string")),
        Value::Array(_) => Err(ParseError::NotAnObject("an array")),
    }
}

fn validate(map: Map<String, Value>) -> Result<ResearchRecord, ParseError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| ParseError::Invalid(e.to_string()))
}

/// Decode `raw` as a JSON object with all four fields present and well-typed.
pub fn strict_parse(raw: &str) -> Result<ResearchRecord, ParseError> {
    validate(decode_object(raw)?)
}

/// Decode `raw` again, default the absent optional collections, re-validate.
///
/// Keys that are present keep their value even if it has the wrong shape,
/// so `"sources": null` still fails.
pub fn repair(raw: &str) -> Result<ResearchRecord, ParseError> {
    let mut map = decode_object(raw)?;

    for key in OPTIONAL_COLLECTIONS {
        if !map.contains_key(key) {
            debug!(field = key, "Defaulting absent field to an empty list");
            map.insert(key.to_string(), Value::Array(Vec::new()));
        }
    }

    validate(map)
}

/// Strict parse first, repair on failure.
pub fn interpret(raw: &str) -> Result<Interpreted, InterpretError> {
    let strict_error = match strict_parse(raw) {
        Ok(record) => {
            return Ok(Interpreted {
                record,
                path: ParsePath::Strict,
            })
        }
        Err(e) => e,
    };

    warn!(error = %strict_error, "Strict parse failed, attempting repair");

    match repair(raw) {
        Ok(record) => Ok(Interpreted {
            record,
            path: ParsePath::Repaired { strict_error },
        }),
        Err(repair_error) => {
            warn!(error = %repair_error, "Repair failed");
            Err(InterpretError {
                strict: strict_error,
                repair: repair_error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "topic": "Quantum computing",
        "summary": "  Qubits, superposition.\nEntanglement.  ",
        "sources": ["https://b.example", "https://a.example", "https://b.example"],
        "tools_used": ["wiki: Qubit", "search", "SEARCH: quantum supremacy"]
    }"#;

    #[test]
    fn test_strict_parse_preserves_values() {
        let record = strict_parse(FULL).unwrap();
        assert_eq!(record.topic(), "Quantum computing");
        assert_eq!(record.summary(), "  Qubits, superposition.\nEntanglement.  ");
        assert_eq!(
            record.sources(),
            ["https://b.example", "https://a.example", "https://b.example"]
        );
        assert_eq!(
            record.tools_used(),
            ["wiki: Qubit", "search", "SEARCH: quantum supremacy"]
        );
    }

    #[test]
    fn test_strict_parse_ignores_unknown_keys() {
        let record =
            strict_parse(r#"{"topic":"T","summary":"S","sources":[],"tools_used":[],"confidence":0.9}"#)
                .unwrap();
        assert_eq!(record, ResearchRecord::new("T", "S", vec![], vec![]));
    }

    #[test]
    fn test_strict_parse_rejects_missing_optional_fields() {
        let err = strict_parse(r#"{"topic":"T","summary":"S","sources":[]}"#).unwrap_err();
        assert!(matches!(&err, ParseError::Invalid(msg) if msg.contains("tools_used")));

        let err = strict_parse(r#"{"topic":"T","summary":"S","tools_used":[]}"#).unwrap_err();
        assert!(matches!(&err, ParseError::Invalid(msg) if msg.contains("sources")));
    }

    #[test]
    fn test_strict_parse_rejects_wrong_shapes() {
        assert!(strict_parse(r#"{"topic":1,"summary":"S","sources":[],"tools_used":[]}"#).is_err());
        assert!(strict_parse(r#"{"topic":"T","summary":"S","sources":"a","tools_used":[]}"#).is_err());
        assert!(strict_parse(r#"{"topic":"T","summary":"S","sources":[],"tools_used":[1]}"#).is_err());
    }

    #[test]
    fn test_strict_parse_rejects_non_objects() {
        assert_eq!(
            strict_parse(r#"["T", "S", [], []]"#).unwrap_err(),
            ParseError::NotAnObject("an array")
        );
        assert_eq!(
            strict_parse(r#""T""#).unwrap_err(),
            ParseError::NotAnObject("a string")
        );
    }

    #[test]
    fn test_repair_fills_sources() {
        let record = repair(r#"{"topic":"T","summary":"S","tools_used":["wiki"]}"#).unwrap();
        assert_eq!(record, ResearchRecord::new("T", "S", vec![], vec!["wiki".into()]));
    }

    #[test]
    fn test_repair_fills_tools_used() {
        let record = repair(r#"{"topic":"T","summary":"S","sources":["x","y"]}"#).unwrap();
        assert_eq!(
            record,
            ResearchRecord::new("T", "S", vec!["x".into(), "y".into()], vec![])
        );
    }

    #[test]
    fn test_repair_fills_both() {
        let record = repair(r#"{"topic":"T","summary":"S"}"#).unwrap();
        assert_eq!(record, ResearchRecord::new("T", "S", vec![], vec![]));
    }

    #[test]
    fn test_repair_does_not_touch_present_keys() {
        let err = repair(r#"{"topic":"T","summary":"S","sources":null}"#).unwrap_err();
        assert!(matches!(err, ParseError::Invalid(_)));
    }

    #[test]
    fn test_required_fields_never_repaired() {
        for raw in [
            r#"{"summary":"S","sources":[],"tools_used":[]}"#,
            r#"{"topic":"T","sources":[],"tools_used":[]}"#,
            r#"{"topic":"T"}"#,
            r#"{"summary":"S"}"#,
            r#"{}"#,
        ] {
            assert!(strict_parse(raw).is_err(), "strict accepted {}", raw);
            assert!(repair(raw).is_err(), "repair accepted {}", raw);
            assert!(interpret(raw).is_err(), "interpret accepted {}", raw);
        }
    }

    #[test]
    fn test_malformed_text_fails_both_stages() {
        for raw in [
            "Here is your research: {\"topic\": \"T\"}",
            "{\"topic\": \"T\", \"summary\": \"S\",}",
            "```json\n{\"topic\":\"T\",\"summary\":\"S\"}\n```",
            "",
        ] {
            assert!(matches!(strict_parse(raw), Err(ParseError::Decode(_))));
            assert!(matches!(repair(raw), Err(ParseError::Decode(_))));
        }
    }

    #[test]
    fn test_interpret_strict_path() {
        let interpreted = interpret(FULL).unwrap();
        assert_eq!(interpreted.path, ParsePath::Strict);
        assert!(!interpreted.was_repaired());
    }

    #[test]
    fn test_interpret_repair_path() {
        let interpreted = interpret(r#"{"topic":"T","summary":"S"}"#).unwrap();
        assert!(interpreted.was_repaired());
        assert_eq!(interpreted.record, ResearchRecord::new("T", "S", vec![], vec![]));
        match interpreted.path {
            ParsePath::Repaired { strict_error } => {
                assert!(matches!(strict_error, ParseError::Invalid(_)))
            }
            ParsePath::Strict => panic!("expected repair path"),
        }
    }

    #[test]
    fn test_interpret_failure_keeps_both_diagnostics() {
        let err = interpret(r#"{"summary":"S","sources":[],"tools_used":[]}"#).unwrap_err();
        assert!(matches!(&err.strict, ParseError::Invalid(msg) if msg.contains("topic")));
        assert!(matches!(&err.repair, ParseError::Invalid(msg) if msg.contains("topic")));
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn test_display() {
        let record = ResearchRecord::new("T", "S", vec![], vec!["wiki: X".into(), "search".into()]);
        assert_eq!(
            record.to_string(),
            "Topic: T\nSummary: S\nSources: (none)\nTools used: wiki: X, search"
        );
    }
}
