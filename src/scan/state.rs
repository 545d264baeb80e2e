/// Scan loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Waiting for the capture source to become ready (initial state)
    WaitingForSource,
    /// Running scan cycles on the configured interval
    Scanning,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::WaitingForSource => write!(f, "Waiting for source"),
            ScanState::Scanning => write!(f, "Scanning"),
        }
    }
}
