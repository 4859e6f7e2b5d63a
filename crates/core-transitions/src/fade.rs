use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use core_events::EventScope;
use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, PollEvent, Transition,
    TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

/// Time-proportional interpolation toward the most recent input buffer.
///
/// `speed` is the time a full 0→100 swing takes; per tick the output moves
/// by `elapsed / speed` of the remaining per-channel delta, computed from
/// the real elapsed duration rather than the tick count.
pub struct FadeTransition {
    meta: ComponentMeta,
    speed: Duration,
    poll_event: PollEvent,
}

impl FadeTransition {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Self::with_speed(
            meta,
            manager.poll_event().clone(),
            properties.get("speed")?,
        ))
    }

    pub fn with_speed(meta: ComponentMeta, poll_event: PollEvent, speed: Duration) -> Rc<Self> {
        Rc::new(FadeTransition {
            meta,
            speed,
            poll_event,
        })
    }
}

impl Component for FadeTransition {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_transition(self: Rc<Self>) -> Option<Rc<dyn Transition>> {
        Some(self)
    }
}

/// State the tick callback writes while the instance is borrowed
/// elsewhere in the chain.
#[derive(Default)]
struct FadeShared {
    factor: Cell<f64>,
    deltas_known: Cell<bool>,
}

struct FadeInstance {
    transition: Rc<FadeTransition>,
    shared: Rc<FadeShared>,
    output: ChannelBuffer,
    target: ChannelBuffer,
    deltas: Vec<f64>,
    poll_scope: EventScope,
}

impl FadeInstance {
    fn calculate_deltas(&mut self) -> bool {
        let mut changed = false;
        for (index, delta) in self.deltas.iter_mut().enumerate() {
            *delta = self.target.get(index).get() - self.output.get(index).get();
            changed = changed || delta.abs() > 0.0;
        }
        changed
    }

    fn calculate_output(&mut self) -> bool {
        let factor = self.shared.factor.get();
        let mut changed = false;
        for (index, &delta) in self.deltas.iter().enumerate() {
            let current = self.output.get(index).get();
            let target = self.target.get(index).get();
            let mut next = current + factor * delta;
            if (delta > 0.0 && next > target) || (delta < 0.0 && next < target) {
                next = target;
            }
            changed = changed || next != current;
            self.output.set(index, ChannelValue::new(next));
        }
        changed
    }
}

impl TransitionInstance for FadeInstance {
    fn transform(&mut self, pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        if self.output.is_empty() {
            debug!(target: "transition.fade", id = %self.transition.meta.id, "first transform");
            self.output.resize(values.len());
            self.deltas.resize(values.len(), 0.0);
        }

        self.target = std::mem::take(values);

        let mut changed = false;
        if !self.shared.deltas_known.get() {
            changed = self.calculate_deltas();
            debug!(
                target: "transition.fade",
                from = self.output.get(0).get(),
                to = self.target.get(0).get(),
                delta = self.deltas.first().copied().unwrap_or(0.0),
                "fade retargeted"
            );
        }
        if self.calculate_output() {
            changed = true;
        }

        *values = self.output.clone();
        self.shared.deltas_known.set(false);

        if !changed {
            debug!(target: "transition.fade", "fade settled, releasing tick subscription");
            self.poll_scope.clear();
            return;
        }

        if !self.poll_scope.is_engaged() {
            let shared = self.shared.clone();
            let pipeline = pipeline.clone();
            let speed = self.transition.speed.as_secs_f64();
            self.poll_scope.set(self.transition.poll_event.subscribe(
                move |elapsed: &Duration| {
                    shared.factor.set(elapsed.as_secs_f64() / speed);
                    shared.deltas_known.set(true);
                    pipeline.retransfer();
                },
            ));
        }
    }
}

impl Transition for FadeTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(FadeInstance {
            transition: self,
            shared: Rc::new(FadeShared::default()),
            output: ChannelBuffer::new(),
            target: ChannelBuffer::new(),
            deltas: Vec::new(),
            poll_scope: EventScope::default(),
        })
    }
}
