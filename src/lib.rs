//! Chat Relay - session-scoped HTTP/SSE front for the claude.ai chat API
//!
//! Callers authenticate once, then list organizations and conversations and
//! stream replies as server-sent events. Each relayed reply is a bounded
//! producer task that stops when the caller disconnects.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
