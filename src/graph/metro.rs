use crate::graph::context::SynthesisContext;
use crate::graph::control::{Control, ControlHandle, ControlNode, ControlOutput};

/// Emits a trigger at a regular BPM interval.
///
/// Keys off the context's elapsed time rather than counting blocks, and
/// re-anchors by whole beats so rounding never accumulates into drift. A
/// backwards or wildly large jump in time re-anchors immediately.
pub struct ControlMetroNode {
    bpm: Control,
    last_click_time: f64,
}

impl ControlNode for ControlMetroNode {
    fn compute(&mut self, ctx: &SynthesisContext) -> ControlOutput {
        let bpm = self.bpm.tick(ctx).value.max(0.001);
        let seconds_per_beat = 60.0 / bpm as f64;
        let delta = ctx.elapsed_time - self.last_click_time;

        let triggered = if delta >= 2.0 * seconds_per_beat || delta < 0.0 {
            self.last_click_time = ctx.elapsed_time;
            true
        } else if delta >= seconds_per_beat {
            self.last_click_time += seconds_per_beat;
            true
        } else {
            false
        };

        ControlOutput {
            value: 1.0,
            triggered,
        }
    }
}

#[derive(Clone)]
pub struct ControlMetro {
    handle: ControlHandle<ControlMetroNode>,
}

impl ControlMetro {
    pub fn new(bpm: impl Into<Control>) -> Self {
        Self {
            handle: ControlHandle::new(ControlMetroNode {
                bpm: bpm.into(),
                last_click_time: 0.0,
            }),
        }
    }
}

impl From<ControlMetro> for Control {
    fn from(metro: ControlMetro) -> Control {
        metro.handle.control()
    }
}
