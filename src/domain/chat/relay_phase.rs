//! Lifecycle of one relay invocation.

use std::fmt;

use crate::domain::foundation::StateMachine;

/// Phase of a single relay.
///
/// ```text
/// Init -> UpstreamConnecting -> Streaming -> Completed
///                    |              |------> Failed
///                    |              `------> Cancelled
///                    `-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Init,
    UpstreamConnecting,
    Streaming,
    /// Terminal sentinel emitted.
    Completed,
    /// Request-level error, or in-band error event emitted.
    Failed,
    /// Client went away; nothing further is owed.
    Cancelled,
}

impl StateMachine for RelayPhase {
    fn valid_transitions(&self) -> &'static [Self] {
        use RelayPhase::*;
        match self {
            Init => &[UpstreamConnecting],
            UpstreamConnecting => &[Streaming, Failed],
            Streaming => &[Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => &[],
        }
    }
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelayPhase::Init => "init",
            RelayPhase::UpstreamConnecting => "upstream_connecting",
            RelayPhase::Streaming => "streaming",
            RelayPhase::Completed => "completed",
            RelayPhase::Failed => "failed",
            RelayPhase::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
