//! Typed events carried by the analysis stream

use serde::{Deserialize, Serialize};

/// Events emitted by the analysis service during a query
///
/// Wire payloads are JSON objects tagged by a `type` field, except for the
/// top-level fault `{"error": "..."}` which the service may emit at any time
/// without a tag. Use [`AnalysisEvent::parse`] to decode a raw payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// Analysis plan ready; the given number of steps will follow
    Init { total_steps: u32 },
    /// A step started executing server-side
    StepStart { step_index: u32, instruction: String },
    /// A step finished successfully
    StepComplete {
        instruction: String,
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_index: Option<u32>,
    },
    /// A step failed; remaining steps still run
    StepError {
        instruction: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_index: Option<u32>,
    },
    /// All steps done, response is final
    Complete,
    /// Untyped top-level error payload; terminates the response
    Fault { message: String },
    /// Unrecognized event tag; skipped by consumers
    #[serde(other)]
    Unknown,
}

impl AnalysisEvent {
    /// Decode one raw frame payload.
    ///
    /// An object without a `type` tag but with an `error` field is the
    /// service's top-level fault shape and maps to [`AnalysisEvent::Fault`].
    pub fn parse(payload: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        if value.get("type").is_none() {
            if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
                return Ok(AnalysisEvent::Fault {
                    message: message.to_string(),
                });
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Check if this event ends the in-flight response
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisEvent::Complete | AnalysisEvent::Fault { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init() {
        let event = AnalysisEvent::parse(r#"{"type": "init", "total_steps": 3}"#).unwrap();
        assert_eq!(event, AnalysisEvent::Init { total_steps: 3 });
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_parse_step_start() {
        let event = AnalysisEvent::parse(
            r#"{"type": "step_start", "step_index": 0, "instruction": "Generate SQL"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            AnalysisEvent::StepStart {
                step_index: 0,
                instruction: "Generate SQL".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_step_complete_with_index() {
        let event = AnalysisEvent::parse(
            r#"{"type": "step_complete", "step_index": 1, "instruction": "Run query", "response": "SELECT 1"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            AnalysisEvent::StepComplete {
                instruction: "Run query".to_string(),
                response: "SELECT 1".to_string(),
                step_index: Some(1),
            }
        );
    }

    #[test]
    fn test_parse_step_complete_without_index() {
        let event = AnalysisEvent::parse(
            r#"{"type": "step_complete", "instruction": "Run query", "response": "ok"}"#,
        )
        .unwrap();
        match event {
            AnalysisEvent::StepComplete { step_index, .. } => assert_eq!(step_index, None),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_step_error_is_not_a_fault() {
        // Carries both a type tag and an error field; the tag wins.
        let event = AnalysisEvent::parse(
            r#"{"type": "step_error", "step_index": 0, "instruction": "Plot", "error": "no backend"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            AnalysisEvent::StepError {
                instruction: "Plot".to_string(),
                error: "no backend".to_string(),
                step_index: Some(0),
            }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_parse_complete() {
        let event = AnalysisEvent::parse(r#"{"type": "complete"}"#).unwrap();
        assert_eq!(event, AnalysisEvent::Complete);
        assert!(event.is_terminal());
    }

    #[test]
    fn test_parse_untyped_error_is_fault() {
        let event = AnalysisEvent::parse(r#"{"error": "backend down"}"#).unwrap();
        assert_eq!(
            event,
            AnalysisEvent::Fault {
                message: "backend down".to_string(),
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_parse_unknown_tag() {
        let event = AnalysisEvent::parse(r#"{"type": "heartbeat"}"#).unwrap();
        assert_eq!(event, AnalysisEvent::Unknown);
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(AnalysisEvent::parse("{not json").is_err());
    }

    #[test]
    fn test_parse_untyped_without_error_field() {
        // No tag, no error field: not a recognizable event.
        assert!(AnalysisEvent::parse(r#"{"progress": 0.5}"#).is_err());
    }
}
