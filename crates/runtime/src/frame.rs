/// Frame counter for the render cadence.
///
/// Frames are numbered from 1; `Frame::default()` is the state before the
/// first tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Frame {
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1)
    }
}

/// Coalesces redraw requests issued between two frames.
///
/// Input events and asynchronous completions call [`RedrawGate::request`];
/// the frame loop calls [`RedrawGate::take`] once per tick and skips the
/// frame when nothing asked for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RedrawGate {
    requested: bool,
}

impl RedrawGate {
    /// A new gate is armed so the very first frame is drawn.
    pub fn new() -> Self {
        Self { requested: true }
    }

    pub fn request(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Returns whether a redraw was requested and disarms the gate.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.requested, false)
    }
}

impl Default for RedrawGate {
    fn default() -> Self {
        Self::new()
    }
}
