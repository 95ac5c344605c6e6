//! Session event types

use crate::message::{ChatMessage, Step};
use serde::{Deserialize, Serialize};

/// Events broadcast while a query is in flight, for incremental rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// User message appended; the analysis request is being opened
    QueryStart { query: String },

    /// The service announced its plan
    PlanReady { total_steps: u32 },

    /// A step started executing server-side
    StepStart { step_index: u32, instruction: String },

    /// A step finished (successfully or not) and was recorded
    StepRecorded { step: Step },

    /// Terminal message appended to history (assistant response or error)
    MessageFinal { message: ChatMessage },

    /// The in-flight request was cancelled; `message` is the appended notice
    Cancelled { message: ChatMessage },
}

impl SessionEvent {
    /// Check if this event ends the in-flight query
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::MessageFinal { .. } | SessionEvent::Cancelled { .. }
        )
    }
}
