use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use core_graph::{Component, ComponentMeta, Error, Input, InputChangeEvent, Manager};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

use crate::bus::GpioBus;
use crate::driver::Pull;

/// Polls a pin on every tick and fires a boolean channel on edges.
pub struct GpioInput {
    meta: ComponentMeta,
    bus: Rc<GpioBus>,
    pin: u16,
    value: Cell<bool>,
    input_change: InputChangeEvent,
}

impl GpioInput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let bus: Rc<GpioBus> = manager.standalone(&meta, &properties.child("gpio")?, "gpio bus")?;
        let pin = properties.get("gpioPin")?;
        let pull: Pull = properties.get_or("pull", "off")?;
        bus.request_input_pin(manager, pin, pull);

        let input = Rc::new(GpioInput {
            meta,
            bus,
            pin,
            value: Cell::new(false),
            input_change: InputChangeEvent::new(),
        });
        let weak = Rc::downgrade(&input);
        manager.poll_event().subscribe(move |_| {
            if let Some(input) = weak.upgrade() {
                input.poll();
            }
        });
        Ok(input)
    }

    fn poll(&self) {
        let level = self.bus.digital_read(self.pin);
        if level != self.value.get() {
            self.value.set(level);
            self.input_change
                .fire(&ChannelBuffer::from(ChannelValue::from(level)));
        }
    }
}

impl Component for GpioInput {
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

impl Input for GpioInput {
    fn emits_channels(&self) -> usize {
        1
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}
