use std::any::Any;
use std::rc::Rc;

use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, Transition, TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

/// Prepends `offset` zero-valued channels; `emits(n) = n + offset`.
pub struct ShiftTransition {
    meta: ComponentMeta,
    offset: usize,
}

impl ShiftTransition {
    pub fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Self::with_offset(meta, properties.get("offset")?))
    }

    pub fn with_offset(meta: ComponentMeta, offset: usize) -> Rc<Self> {
        Rc::new(ShiftTransition { meta, offset })
    }
}

impl Component for ShiftTransition {
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

struct ShiftInstance {
    transition: Rc<ShiftTransition>,
}

impl TransitionInstance for ShiftInstance {
    fn transform(&mut self, _pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        values.shift(self.transition.offset);
    }
}

impl Transition for ShiftTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels + self.offset
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(ShiftInstance { transition: self })
    }
}
