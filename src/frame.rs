// ============================================================================
// frame.rs - wavetank
// The per-frame sequence, independent of any window or GPU. Both drivers
// (the windowed app and headless runs) call the same three entry points
// each frame: `frame(now)` to drain inputs and step, `field()` to take the
// upload view, and `swap()` once the frame is presented.
// ============================================================================

use std::collections::VecDeque;

use crate::clock::FrameClock;
use crate::events::{InputEvent, Selection};
use crate::field::FieldView;
use crate::sim::Simulation;

/// What one frame did, for the HUD and the drivers.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameReport {
    /// Bounded simulation step taken this frame (zero while paused).
    pub dt: f32,
    /// The wall clock outran the stability limit this frame.
    pub overrun: bool,
    /// The engine actually stepped.
    pub advanced: bool,
    /// The displayed output changed; the display selector needs rewriting
    /// before this frame is drawn.
    pub selection_changed: bool,
}

/// Owns the simulation, the frame clock, the selection and the input
/// queue, and runs them in a fixed order once per display frame:
///
/// 1. drain queued inputs in arrival order
/// 2. derive the bounded step from the host timestamp
/// 3. advance the engine
/// 4. hand out the selected field view for upload and drawing
/// 5. flip buffer roles via `swap` after presentation
///
/// Because the view is taken after the advance but before the swap, the
/// frame on screen always shows the state the previous frame computed.
pub struct FramePipeline {
    sim: Box<dyn Simulation>,
    clock: FrameClock,
    selection: Selection,
    queue: VecDeque<InputEvent>,
    paused: bool,
    /// The engine stepped since the last role flip.
    stepped: bool,
    frame: u64,
}

impl FramePipeline {
    /// Builds the pipeline and seeds the engine's starting condition at
    /// simulation time `start_t`.
    pub fn new(mut sim: Box<dyn Simulation>, clock: FrameClock, start_t: f32) -> Self {
        sim.set_initial(start_t);
        let selection = Selection::new(sim.output_names().len());
        Self {
            sim,
            clock,
            selection,
            queue: VecDeque::new(),
            paused: false,
            stepped: false,
            frame: 0,
        }
    }

    /// Enqueue an interaction. Nothing is applied until the next frame.
    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn selection_index(&self) -> usize {
        self.selection.index()
    }

    /// Name of the output currently routed to the display.
    pub fn output_name(&self) -> &'static str {
        self.sim.output_names()[self.selection.index()]
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn max_dt(&self) -> f32 {
        self.clock.max_dt()
    }

    pub fn overrun_episodes(&self) -> u32 {
        self.clock.overrun_episodes()
    }

    pub fn overrun_frames(&self) -> u64 {
        self.clock.overrun_frames()
    }

    /// Drain inputs, derive the step for host timestamp `now` (monotonic
    /// seconds) and advance the engine. The caller then takes `field()`,
    /// uploads and draws it, and finishes the frame with `swap()`.
    pub fn frame(&mut self, now: f64) -> FrameReport {
        let mut report = FrameReport::default();

        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::CycleField => {
                    self.selection.cycle();
                    report.selection_changed = true;
                }
                InputEvent::Reseed { x, y } => {
                    log::debug!("reseed at ({:.3}, {:.3})", x, y);
                    self.sim.reseed(x, y);
                }
                InputEvent::TogglePause => {
                    self.paused = !self.paused;
                    if !self.paused {
                        // The gap spent paused is expected; resync so it
                        // is not reported as an overrun.
                        self.clock.resync();
                    }
                    log::info!("{}", if self.paused { "paused" } else { "resumed" });
                }
            }
        }

        if !self.paused {
            let step = self.clock.tick(now);
            self.sim.advance(step.dt);
            self.stepped = true;
            report.dt = step.dt;
            report.overrun = step.overrun;
            report.advanced = true;
        }
        self.frame += 1;
        report
    }

    /// View of the selected output for upload. Taken fresh every frame;
    /// borrows the pipeline, so it cannot outlive the following `swap`.
    pub fn field(&self) -> FieldView<'_> {
        self.sim.field(self.selection.index())
    }

    /// Flip buffer roles after presentation. Only acts when the engine
    /// stepped since the last flip; a paused frame must not rotate a
    /// double-buffered display back to its stale slot.
    pub fn swap(&mut self) {
        if self.stepped {
            self.sim.swap();
            self.stepped = false;
        }
    }
}
