// ============================================================================
// events.rs - wavetank
// Interaction messages and the output selection they act on. Window
// callbacks only enqueue; the frame pipeline drains the queue at the top
// of each frame, so every mutation lands at a defined point in the frame.
// ============================================================================

/// One queued interaction, applied in arrival order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Cycle which output field is routed to the display.
    CycleField,
    /// Re-deposit the initial disturbance at a normalized viewport point.
    Reseed { x: f32, y: f32 },
    /// Stop or resume stepping. Rendering continues either way.
    TogglePause,
}

/// Which of the engine's outputs is routed to the display.
#[derive(Clone, Copy, Debug)]
pub struct Selection {
    index: usize,
    count: usize,
}

impl Selection {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "an engine must expose at least one output");
        Self { index: 0, count }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Wrapping successor over the output set.
    pub fn cycle(&mut self) {
        self.index = (self.index + 1) % self.count;
    }
}
