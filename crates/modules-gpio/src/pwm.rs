use std::any::Any;
use std::rc::Rc;

use core_graph::{bind_input, Component, ComponentMeta, Error, Manager, Output};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

use crate::bus::GpioBus;

/// Drives one pin per channel, using the channel value as the duty cycle
/// in `0..=100`.
pub struct SoftPwmOutput {
    meta: ComponentMeta,
    bus: Rc<GpioBus>,
    pins: Vec<u16>,
}

impl SoftPwmOutput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let bus: Rc<GpioBus> = manager.standalone(&meta, &properties.child("gpio")?, "gpio bus")?;
        let pins: Vec<u16> = properties.get("gpioPins")?;
        for &pin in &pins {
            bus.request_pwm_pin(manager, pin);
        }

        let output = Rc::new(SoftPwmOutput { meta, bus, pins });
        let as_output: Rc<dyn Output> = output.clone();
        bind_input(manager, &as_output, &properties.child("input")?)?;
        Ok(output)
    }
}

impl Component for SoftPwmOutput {
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

impl Output for SoftPwmOutput {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels == self.pins.len()
    }

    fn set(&self, _source: &ComponentMeta, values: &ChannelBuffer) {
        for (&pin, value) in self.pins.iter().zip(values.iter()) {
            self.bus.soft_pwm_write(pin, value.get().round() as u16);
        }
    }
}
