//! Plain stdout rendering for session events and transcripts

use atlas_session::{ChatMessage, ConversationSummary, Role, SessionEvent, Step, StepStatus};

/// Truncate to at most `max` characters, appending an ellipsis if cut
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{}...", truncated)
}

/// Render one live session event as it arrives
pub fn render_event(event: &SessionEvent) {
    match event {
        SessionEvent::QueryStart { .. } => {}
        SessionEvent::PlanReady { total_steps } => {
            println!("[Plan: {} steps]", total_steps);
        }
        SessionEvent::StepStart {
            step_index,
            instruction,
        } => {
            println!("[Step {}: {}]", step_index + 1, instruction);
        }
        SessionEvent::StepRecorded { step } => match step.status {
            StepStatus::Complete => {
                println!("  done: {}", truncate_chars(&render_response(step), 200));
            }
            StepStatus::Error => {
                println!("  failed: {}", truncate_chars(&step.response, 200));
            }
        },
        SessionEvent::MessageFinal { message } => {
            println!();
            render_message(message);
        }
        SessionEvent::Cancelled { message } => {
            println!("\n{}", message.content);
        }
    }
}

/// Render a structured step response; JSON results get pretty-printed
fn render_response(step: &Step) -> String {
    match serde_json::from_str::<serde_json::Value>(&step.response) {
        Ok(value) if value.is_object() || value.is_array() => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| step.response.clone())
        }
        _ => step.response.clone(),
    }
}

/// Render one history entry
pub fn render_message(message: &ChatMessage) {
    match message.role {
        Role::User => println!("> {}", message.content),
        Role::Ai => {
            println!("[Analysis of \"{}\"]", truncate_chars(&message.content, 60));
            for (i, step) in message.steps.iter().enumerate() {
                let marker = match step.status {
                    StepStatus::Complete => "ok",
                    StepStatus::Error => "err",
                };
                println!("  {}. [{}] {}", i + 1, marker, step.instruction);
                for line in render_response(step).lines() {
                    println!("     {}", line);
                }
            }
        }
        Role::Error => println!("Error: {}", message.content),
    }
}

/// Render a stored transcript
pub fn render_history(messages: &[ChatMessage]) {
    for message in messages {
        render_message(message);
        println!();
    }
}

/// Render the conversation listing
pub fn render_summaries(summaries: &[ConversationSummary]) {
    if summaries.is_empty() {
        println!("No saved conversations.");
        return;
    }
    for summary in summaries {
        let updated = summary.updated_at.as_deref().unwrap_or("-");
        println!("{}  {}  {}", summary.id, updated, summary.title);
    }
}
