use std::any::Any;
use std::rc::Rc;

use tracing::debug;

use core_graph::{bind_input, Component, ComponentMeta, Error, Manager, Output};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

/// Accepts a configured channel count and logs every buffer it receives.
pub struct DebugOutput {
    meta: ComponentMeta,
    channels: usize,
}

impl DebugOutput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let output = Rc::new(DebugOutput {
            meta,
            channels: properties.get("channels")?,
        });
        let as_output: Rc<dyn Output> = output.clone();
        bind_input(manager, &as_output, &properties.child("input")?)?;
        Ok(output)
    }
}

impl Component for DebugOutput {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_output(self: Rc<Self>) -> Option<Rc<dyn Output>> {
        Some(self)
    }
}

impl Output for DebugOutput {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels == self.channels
    }

    fn set(&self, source: &ComponentMeta, values: &ChannelBuffer) {
        debug!(
            target: "output.debug",
            id = %self.meta.id,
            source = %source.id,
            values = %values,
            "set"
        );
    }
}
