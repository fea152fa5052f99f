//! UI runtime state engine for agentdeck.
//!
//! Ingests the heterogeneous backend event stream of a coding-agent
//! session (assistant deltas, reasoning chunks, command/file/tool
//! lifecycle, plan updates, approvals, turn boundaries, overlays, token
//! accounting, errors) and materializes it into per-thread, deep-copyable
//! snapshots for a front end.
//!
//! Data flow: raw event → [`classify`] → [`normalize`] → field resolution
//! → lifecycle mutation → per-type timeline handler → status derivation →
//! [`Engine::snapshot`] on request.
//!
//! The engine owns no I/O: the transport decodes wire envelopes and calls
//! [`normalize`] + [`Engine::apply_agent_event`]; the persistence layer
//! feeds [`Engine::hydrate_history`]; the renderer consumes snapshots.

pub mod attachments;
mod classify;
mod engine;
mod hydrate;
mod normalize;
mod resolve;
mod runtime;
mod status;
mod timeline;
mod usage;

pub use classify::classify;
pub use engine::Engine;
pub use normalize::{decode_payload, normalize, normalize_value};
