//! atlas-stream: wire protocol for the atlas analysis event stream
//!
//! This crate turns the raw byte stream returned by the analysis service into
//! typed events: the frame decoder reassembles `data: `-prefixed frames across
//! arbitrary chunk boundaries, and the client exposes the result as an async
//! stream of raw payloads for the session layer to interpret.

pub mod client;
pub mod decoder;
pub mod error;
pub mod events;

pub use client::{AnalysisClient, PayloadStream};
pub use decoder::FrameDecoder;
pub use error::{Error, Result};
pub use events::AnalysisEvent;
