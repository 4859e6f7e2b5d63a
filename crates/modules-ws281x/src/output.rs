use std::any::Any;
use std::rc::Rc;

use core_graph::{bind_input, Component, ComponentMeta, Error, Manager, Output};
use core_properties::{PropertyError, PropertyNode};
use core_types::ChannelBuffer;

use crate::client::Ws281x;

/// Writes a window of the strip: `first` and `count` select the LEDs this
/// output owns, defaulting to the whole chain.
pub struct Ws281xOutput {
    meta: ComponentMeta,
    ws281x: Rc<Ws281x>,
    first: usize,
    count: usize,
}

impl Ws281xOutput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let ws281x: Rc<Ws281x> =
            manager.standalone(&meta, &properties.child("ws281x")?, "ws281x client")?;
        let first: usize = properties.get_or("first", 0)?;
        let count: usize = if properties.has("count") {
            properties.get("count")?
        } else {
            ws281x.led_count().saturating_sub(first)
        };
        if first + count > ws281x.led_count() {
            return Err(PropertyError::TypeMismatch {
                path: properties.path().to_string(),
                expected: "led window within the strip",
                actual: "out-of-range first/count",
            }
            .into());
        }

        let output = Rc::new(Ws281xOutput {
            meta,
            ws281x,
            first,
            count,
        });
        let as_output: Rc<dyn Output> = output.clone();
        bind_input(manager, &as_output, &properties.child("input")?)?;
        Ok(output)
    }
}

impl Component for Ws281xOutput {
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

impl Output for Ws281xOutput {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels == self.count * 3
    }

    fn set(&self, _source: &ComponentMeta, values: &ChannelBuffer) {
        self.ws281x.send(self.first, values);
    }
}
