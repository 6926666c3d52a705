/// Limits geometry uploads to one per tick.
///
/// The streamer opens the gate at the start of each tick and the first slot
/// that uploads consumes it. High-priority slots upload even through a closed
/// gate, but still close it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadGate {
    open: bool,
}

impl UploadGate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the gate for a new tick.
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Whether an ordinary slot may upload now.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Closes the gate after an upload.
    pub fn consume(&mut self) {
        self.open = false;
    }
}
