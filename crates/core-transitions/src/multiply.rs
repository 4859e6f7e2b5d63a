use std::any::Any;
use std::rc::Rc;

use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, Transition, TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

/// Repeats the buffer content `factor` times; `emits(n) = n · factor`.
pub struct MultiplyTransition {
    meta: ComponentMeta,
    factor: usize,
}

impl MultiplyTransition {
    pub fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Self::with_factor(meta, properties.get("factor")?))
    }

    pub fn with_factor(meta: ComponentMeta, factor: usize) -> Rc<Self> {
        Rc::new(MultiplyTransition { meta, factor })
    }
}

impl Component for MultiplyTransition {
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

struct MultiplyInstance {
    transition: Rc<MultiplyTransition>,
}

impl TransitionInstance for MultiplyInstance {
    fn transform(&mut self, _pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        values.multiply(self.transition.factor);
    }
}

impl Transition for MultiplyTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels * self.factor
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(MultiplyInstance { transition: self })
    }
}
