use std::any::Any;
use std::cell::Cell;
use std::f64::consts::TAU;
use std::rc::Rc;
use std::time::Duration;

use core_events::EventScope;
use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, PollEvent, Transition,
    TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::{colorwheel, ChannelBuffer, ChannelValue, ColorBuffer};

/// Subtype hook of the animate transition: redraws the output buffer from
/// its private phase data and the elapsed tick time.
pub trait Animator: 'static {
    type Data: Default + 'static;

    fn animate(&self, output: &mut ChannelBuffer, data: &mut Self::Data, elapsed: f64);
}

/// Driver-owned continuous redraw: while any input channel is on, the
/// animator repaints on every tick; once all channels are off the output
/// zeroes and the tick subscription is released.
pub struct AnimateTransition<A: Animator> {
    meta: ComponentMeta,
    poll_event: PollEvent,
    animator: A,
}

impl<A: Animator> AnimateTransition<A> {
    pub fn new(meta: ComponentMeta, poll_event: PollEvent, animator: A) -> Rc<Self> {
        Rc::new(AnimateTransition {
            meta,
            poll_event,
            animator,
        })
    }
}

impl<A: Animator> Component for AnimateTransition<A> {
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

#[derive(Default)]
struct AnimateShared {
    polling: Cell<bool>,
    elapsed: Cell<f64>,
}

struct AnimateInstance<A: Animator> {
    transition: Rc<AnimateTransition<A>>,
    shared: Rc<AnimateShared>,
    data: A::Data,
    output: ChannelBuffer,
    poll_scope: EventScope,
}

impl<A: Animator> TransitionInstance for AnimateInstance<A> {
    fn transform(&mut self, pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        if self.output.is_empty() {
            self.output = ChannelBuffer::zeroed(values.len());
        }

        if values.iter().all(ChannelValue::off) {
            self.output.fill(ChannelValue::OFF);
            self.poll_scope.clear();
        } else {
            self.transition.animator.animate(
                &mut self.output,
                &mut self.data,
                self.shared.elapsed.get(),
            );
            if !self.shared.polling.get() {
                let shared = self.shared.clone();
                let pipeline = pipeline.clone();
                self.poll_scope.set(self.transition.poll_event.subscribe(
                    move |elapsed: &Duration| {
                        shared.polling.set(true);
                        shared.elapsed.set(elapsed.as_secs_f64());
                        pipeline.retransfer();
                    },
                ));
            }
        }

        *values = self.output.clone();
        self.shared.polling.set(false);
    }
}

impl<A: Animator> Transition for AnimateTransition<A> {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels % 3 == 0
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(AnimateInstance {
            transition: self,
            shared: Rc::new(AnimateShared::default()),
            data: A::Data::default(),
            output: ChannelBuffer::new(),
            poll_scope: EventScope::default(),
        })
    }
}

fn cyclic_increment(value: &mut f64, increment: f64) {
    *value += increment;
    while *value > 1.0 {
        *value -= 1.0;
    }
}

fn cyclic_decrement(value: &mut f64, decrement: f64) {
    *value -= decrement;
    while *value < 0.0 {
        *value += 1.0;
    }
}

/// Walks brightness and color phases cyclically across the strip: each
/// pixel is the colorwheel color at its phase, dimmed by a sine pulse
/// between `minBright` and `maxBright`.
pub struct WavesAnimator {
    color_range: f64,
    color_speed: f64,
    pulse_range: f64,
    pulse_speed: f64,
    min_bright: f64,
    max_bright: f64,
}

#[derive(Default)]
pub struct WavesData {
    brightness_offset: f64,
    color_offset: f64,
}

impl WavesAnimator {
    pub fn new(
        color_range: f64,
        color_speed: f64,
        pulse_range: f64,
        pulse_speed: f64,
        min_bright: f64,
        max_bright: f64,
    ) -> Self {
        WavesAnimator {
            color_range,
            color_speed,
            pulse_range,
            pulse_speed,
            min_bright,
            max_bright,
        }
    }
}

impl Animator for WavesAnimator {
    type Data = WavesData;

    fn animate(&self, output: &mut ChannelBuffer, data: &mut WavesData, elapsed: f64) {
        let mut colors = ColorBuffer::new(output);
        let count = colors.len().max(1) as f64;

        let mut brightness_index = data.brightness_offset;
        let mut color_index = data.color_offset;
        for index in 0..colors.len() {
            let brightness = (brightness_index * TAU).sin() * (self.max_bright - self.min_bright)
                + self.min_bright;
            colors.set(index, colorwheel(color_index).scale(brightness.clamp(0.0, 1.0)));
            cyclic_increment(&mut brightness_index, self.pulse_range / count);
            cyclic_increment(&mut color_index, self.color_range / count);
        }

        cyclic_decrement(&mut data.brightness_offset, self.pulse_speed * elapsed);
        cyclic_increment(&mut data.color_offset, self.color_speed * elapsed);
    }
}

pub(crate) fn create_waves(
    manager: &mut Manager,
    meta: ComponentMeta,
    properties: &PropertyNode<'_>,
) -> Result<Rc<dyn Component>, Error> {
    let animator = WavesAnimator {
        color_range: properties.get_or("colorRange", 1.0)?,
        color_speed: properties.get("colorSpeed")?,
        pulse_range: properties.get_or("pulseRange", 1.0)?,
        pulse_speed: properties.get("pulseSpeed")?,
        min_bright: properties.get("minBright")?,
        max_bright: properties.get("maxBright")?,
    };
    Ok(AnimateTransition::new(
        meta,
        manager.poll_event().clone(),
        animator,
    ))
}
