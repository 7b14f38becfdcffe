//! Events emitted by a PTY process

/// Event stream item for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyEvent {
    /// A chunk of terminal output, verbatim
    Output(Vec<u8>),
    /// The process exited; always the final event
    Exit(Option<i32>),
}

impl PtyEvent {
    /// Check if this is the terminal exit event
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}
