use glam::DVec2;

/// Accumulates pointer movement between frames.
///
/// Movement is buffered as events arrive and handed to the consumer once per
/// frame by [`PointerTracker::checkpoint`]. Events only touch the buffer and the
/// consumer only reads the checkpointed slot, so each frame sees every delta
/// exactly once.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    /// Last absolute position; `None` until the first sample after (re)acquire.
    last: Option<DVec2>,
    buffered: DVec2,
    checkpointed: DVec2,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an absolute pointer position.
    ///
    /// The first sample after construction or [`PointerTracker::reset`] only sets
    /// the baseline and contributes no movement.
    pub fn on_moved(&mut self, position: DVec2) {
        if let Some(last) = self.last {
            self.buffered += position - last;
        }
        self.last = Some(position);
    }

    /// Feed relative motion from a device that does not report positions.
    pub fn on_motion(&mut self, delta: DVec2) {
        self.buffered += delta;
    }

    /// Forget the baseline and any pending movement, e.g. after regaining focus.
    pub fn reset(&mut self) {
        self.last = None;
        self.buffered = DVec2::ZERO;
    }

    /// Hand the buffered movement to the consumer and clear the buffer.
    pub fn checkpoint(&mut self) {
        self.checkpointed = std::mem::take(&mut self.buffered);
    }

    /// Movement captured by the most recent checkpoint.
    pub fn delta(&self) -> DVec2 {
        self.checkpointed
    }

    /// Movement received since the last checkpoint.
    pub fn pending(&self) -> DVec2 {
        self.buffered
    }

    pub fn has_baseline(&self) -> bool {
        self.last.is_some()
    }
}
