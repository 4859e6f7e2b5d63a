use std::any::Any;
use std::rc::Rc;

use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, Transition, TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ColorBuffer, PercentBounds, Ranged, Rgb, UnitBounds};

fn brightness(values: &ChannelBuffer, index: usize) -> f64 {
    Ranged::<PercentBounds>::from(values.get(index))
        .convert::<UnitBounds>()
        .get()
}

/// Shared shape of the 1-to-3-channel color transitions: any channel count
/// in, three channels per pixel out.
trait ColorMap: 'static {
    fn paint(&self, values: &ChannelBuffer, colors: &mut ColorBuffer<'_>);
}

struct ColorInstance<M> {
    transition: Rc<M>,
}

impl<M: ColorMap> TransitionInstance for ColorInstance<M> {
    fn transform(&mut self, _pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        let mut output = ChannelBuffer::zeroed(values.len() * 3);
        let mut colors = ColorBuffer::new(&mut output);
        self.transition.paint(values, &mut colors);
        *values = output;
    }
}

/// Every pixel is the configured color, scaled by its channel value.
pub struct FillColorTransition {
    meta: ComponentMeta,
    color: Rgb,
}

impl FillColorTransition {
    pub fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Self::with_color(meta, properties.get("color")?))
    }

    pub fn with_color(meta: ComponentMeta, color: Rgb) -> Rc<Self> {
        Rc::new(FillColorTransition { meta, color })
    }
}

impl ColorMap for FillColorTransition {
    fn paint(&self, values: &ChannelBuffer, colors: &mut ColorBuffer<'_>) {
        for index in 0..values.len() {
            colors.set(index, self.color.scale(brightness(values, index)));
        }
    }
}

impl Component for FillColorTransition {
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

impl Transition for FillColorTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels * 3
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(ColorInstance { transition: self })
    }
}

/// Linear blend from `start` to `end` across the pixels, each scaled by
/// its channel value.
pub struct GradientColorTransition {
    meta: ComponentMeta,
    start: Rgb,
    end: Rgb,
}

impl GradientColorTransition {
    pub fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Self::with_colors(
            meta,
            properties.get("start")?,
            properties.get("end")?,
        ))
    }

    pub fn with_colors(meta: ComponentMeta, start: Rgb, end: Rgb) -> Rc<Self> {
        Rc::new(GradientColorTransition { meta, start, end })
    }
}

impl ColorMap for GradientColorTransition {
    fn paint(&self, values: &ChannelBuffer, colors: &mut ColorBuffer<'_>) {
        let steps = values.len().saturating_sub(1).max(1) as f64;
        let delta_red = (f64::from(self.end.red()) - f64::from(self.start.red())) / steps;
        let delta_green = (f64::from(self.end.green()) - f64::from(self.start.green())) / steps;
        let delta_blue = (f64::from(self.end.blue()) - f64::from(self.start.blue())) / steps;
        for index in 0..values.len() {
            let position = index as f64;
            let color = Rgb::new(
                (f64::from(self.start.red()) + delta_red * position).round() as u8,
                (f64::from(self.start.green()) + delta_green * position).round() as u8,
                (f64::from(self.start.blue()) + delta_blue * position).round() as u8,
            );
            colors.set(index, color.scale(brightness(values, index)));
        }
    }
}

impl Component for GradientColorTransition {
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

impl Transition for GradientColorTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels * 3
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(ColorInstance { transition: self })
    }
}
