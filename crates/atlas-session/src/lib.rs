//! atlas-session: conversation state over the analysis event stream
//!
//! This crate folds decoded analysis events into an ordered conversation
//! history, persists that history through a pluggable store, and exposes
//! cancellation and progress events for front ends.

pub mod error;
pub mod events;
pub mod handle;
pub mod message;
pub mod session;
pub mod store;
pub mod streaming;
pub mod transport;

pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use message::{ChatMessage, Conversation, Role, Step, StepStatus};
pub use session::{CANCELLED_NOTICE, ChatSession, TRANSPORT_FAILURE_NOTICE};
pub use store::{ConversationStore, ConversationSummary, FileStore, HttpStore};
pub use streaming::StreamingMessage;
pub use transport::AnalysisTransport;
