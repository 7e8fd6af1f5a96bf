//! vibecheck: a personality read on your Spotify listening taste.
//!
//! The crate is the orchestration core of the app: a Supabase-backed session
//! provider, a Spotify top-statistics client, a Gemini-backed narrative
//! generator, and the flow state machine that wires them together. The binary
//! in `main.rs` is a thin terminal driver over this library.

pub mod config;
pub mod flow;
pub mod narrative;
pub mod reveal;
pub mod session;
pub mod stats;

pub use config::Settings;
pub use flow::Orchestrator;
