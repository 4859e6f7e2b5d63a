use std::any::Any;
use std::rc::Rc;

use tracing::debug;

use core_graph::{Component, ComponentMeta, Error, Input, InputChangeEvent, Manager};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

use crate::bridge::Vdcd;

/// One digital-home device surfaced as a 1-channel input: the bridge
/// pushes value updates, which arrive here already deduplicated.
pub struct VdcdInput {
    meta: ComponentMeta,
    input_change: InputChangeEvent,
}

impl VdcdInput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let vdcd: Rc<Vdcd> = manager.standalone(&meta, &properties.child("vdcd")?, "vdcd bridge")?;
        let output_type: String = properties.get_or("outputType", "")?;

        let input = Rc::new(VdcdInput {
            meta,
            input_change: InputChangeEvent::new(),
        });
        let weak = Rc::downgrade(&input);
        vdcd.register_device(
            input.meta.id.clone(),
            properties.get("dsuid")?,
            properties.get("group")?,
            (!output_type.is_empty()).then_some(output_type),
            properties.get_or("dimmable", false)?,
            move |value| {
                if let Some(input) = weak.upgrade() {
                    input.set(value);
                }
            },
        );
        Ok(input)
    }

    fn set(&self, value: f64) {
        debug!(target: "vdcd", id = %self.meta.id, value, "device value changed");
        self.input_change
            .fire(&ChannelBuffer::from(ChannelValue::scaled(value, 0.0, 100.0)));
    }
}

impl Component for VdcdInput {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_input(self: Rc<Self>) -> Option<Rc<dyn Input>> {
        Some(self)
    }
}

impl Input for VdcdInput {
    fn emits_channels(&self) -> usize {
        1
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}
