//! Accumulator folding analysis events into an in-flight assistant response

use crate::message::{ChatMessage, Step, StepStatus};
use atlas_stream::AnalysisEvent;
use serde::{Deserialize, Serialize};

/// The step currently executing server-side. At most one is live at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStep {
    pub index: u32,
    pub instruction: String,
}

/// Transient state of an assistant response while its steps are arriving.
///
/// Exactly one exists per in-flight query. [`StreamingMessage::apply`] folds
/// one event at a time; a returned message is the terminal fold and the
/// accumulator accepts no further events.
#[derive(Debug, Clone)]
pub struct StreamingMessage {
    query: String,
    steps: Vec<Step>,
    total_steps: u32,
    current_step: Option<CurrentStep>,
    is_streaming: bool,
}

impl StreamingMessage {
    /// Start accumulating a response to the given query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            steps: vec![],
            total_steps: 0,
            current_step: None,
            is_streaming: true,
        }
    }

    /// Fold one event into the state.
    ///
    /// Returns the finalized history entry on a terminal event (`complete`
    /// folds the accumulated steps into an assistant message, a fault
    /// discards them and produces an error message), `None` otherwise.
    pub fn apply(&mut self, event: &AnalysisEvent) -> Option<ChatMessage> {
        if !self.is_streaming {
            return None;
        }

        match event {
            AnalysisEvent::Init { total_steps } => {
                self.total_steps = *total_steps;
                None
            }
            AnalysisEvent::StepStart {
                step_index,
                instruction,
            } => {
                self.current_step = Some(CurrentStep {
                    index: *step_index,
                    instruction: instruction.clone(),
                });
                None
            }
            // Accepted even with no live current step: servers may omit
            // step_start.
            AnalysisEvent::StepComplete {
                instruction,
                response,
                ..
            } => {
                self.steps.push(Step {
                    instruction: instruction.clone(),
                    response: response.clone(),
                    status: StepStatus::Complete,
                });
                self.current_step = None;
                None
            }
            AnalysisEvent::StepError {
                instruction, error, ..
            } => {
                self.steps.push(Step {
                    instruction: instruction.clone(),
                    response: error.clone(),
                    status: StepStatus::Error,
                });
                self.current_step = None;
                None
            }
            AnalysisEvent::Complete => {
                self.is_streaming = false;
                self.current_step = None;
                Some(ChatMessage::ai(
                    self.query.clone(),
                    std::mem::take(&mut self.steps),
                ))
            }
            AnalysisEvent::Fault { message } => {
                self.is_streaming = false;
                self.current_step = None;
                self.steps.clear();
                Some(ChatMessage::error(message.clone()))
            }
            AnalysisEvent::Unknown => {
                tracing::debug!("Ignoring unrecognized analysis event");
                None
            }
        }
    }

    /// Steps finalized so far
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Total step count announced by `init` (0 until seen)
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// The step currently executing server-side, if any
    pub fn current_step(&self) -> Option<&CurrentStep> {
        self.current_step.as_ref()
    }

    /// Whether a terminal event has not yet arrived
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_start(index: u32, instruction: &str) -> AnalysisEvent {
        AnalysisEvent::StepStart {
            step_index: index,
            instruction: instruction.to_string(),
        }
    }

    fn step_complete(instruction: &str, response: &str) -> AnalysisEvent {
        AnalysisEvent::StepComplete {
            instruction: instruction.to_string(),
            response: response.to_string(),
            step_index: None,
        }
    }

    #[test]
    fn test_init_records_total_steps() {
        let mut streaming = StreamingMessage::new("top products");
        assert!(streaming.apply(&AnalysisEvent::Init { total_steps: 4 }).is_none());
        assert_eq!(streaming.total_steps(), 4);
        assert!(streaming.is_streaming());
        assert!(streaming.current_step().is_none());
    }

    #[test]
    fn test_step_start_sets_current_step() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_start(0, "Generate SQL"));
        let current = streaming.current_step().unwrap();
        assert_eq!(current.index, 0);
        assert_eq!(current.instruction, "Generate SQL");
    }

    #[test]
    fn test_step_complete_appends_and_clears_current() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_start(0, "Generate SQL"));
        streaming.apply(&step_complete("Generate SQL", "SELECT 1"));
        assert_eq!(streaming.steps().len(), 1);
        assert_eq!(streaming.steps()[0].status, StepStatus::Complete);
        assert_eq!(streaming.steps()[0].response, "SELECT 1");
        assert!(streaming.current_step().is_none());
    }

    #[test]
    fn test_step_error_recorded_without_halting() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_start(0, "Plot"));
        streaming.apply(&AnalysisEvent::StepError {
            instruction: "Plot".to_string(),
            error: "no backend".to_string(),
            step_index: Some(0),
        });
        assert_eq!(streaming.steps()[0].status, StepStatus::Error);
        assert_eq!(streaming.steps()[0].response, "no backend");

        // Later steps still accumulate.
        streaming.apply(&step_start(1, "Summarize"));
        streaming.apply(&step_complete("Summarize", "done"));
        assert_eq!(streaming.steps().len(), 2);
    }

    #[test]
    fn test_step_complete_without_step_start_is_accepted() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_complete("Generate SQL", "SELECT 1"));
        assert_eq!(streaming.steps().len(), 1);
    }

    #[test]
    fn test_full_sequence_finalizes_assistant_message() {
        let mut streaming = StreamingMessage::new("top products");
        assert!(streaming.apply(&AnalysisEvent::Init { total_steps: 1 }).is_none());
        assert!(streaming.apply(&step_start(0, "Generate SQL")).is_none());
        assert!(streaming.apply(&step_complete("Generate SQL", "SELECT 1")).is_none());

        let message = streaming.apply(&AnalysisEvent::Complete).unwrap();
        assert_eq!(message.role, crate::message::Role::Ai);
        assert_eq!(message.content, "top products");
        assert_eq!(message.steps.len(), 1);
        assert!(streaming.current_step().is_none());
        assert!(!streaming.is_streaming());
    }

    #[test]
    fn test_fault_discards_partial_steps() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_complete("Generate SQL", "SELECT 1"));
        let message = streaming
            .apply(&AnalysisEvent::Fault {
                message: "backend down".to_string(),
            })
            .unwrap();
        assert_eq!(message.role, crate::message::Role::Error);
        assert_eq!(message.content, "backend down");
        assert!(message.steps.is_empty());
        assert!(streaming.steps().is_empty());
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&AnalysisEvent::Complete).unwrap();
        assert!(streaming.apply(&step_complete("late", "late")).is_none());
        assert!(streaming.apply(&AnalysisEvent::Complete).is_none());
        assert!(streaming.steps().is_empty());
    }

    #[test]
    fn test_unknown_event_leaves_state_unchanged() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&AnalysisEvent::Init { total_steps: 2 });
        streaming.apply(&step_start(0, "Generate SQL"));
        streaming.apply(&AnalysisEvent::Unknown);
        assert_eq!(streaming.total_steps(), 2);
        assert!(streaming.current_step().is_some());
        assert!(streaming.is_streaming());
    }

    #[test]
    fn test_current_step_cleared_whenever_not_streaming() {
        let mut streaming = StreamingMessage::new("q");
        streaming.apply(&step_start(0, "Generate SQL"));
        streaming.apply(&AnalysisEvent::Fault {
            message: "boom".to_string(),
        });
        assert!(!streaming.is_streaming());
        assert!(streaming.current_step().is_none());
    }
}
