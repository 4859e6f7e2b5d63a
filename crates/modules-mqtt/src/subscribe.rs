use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use core_graph::{Component, ComponentMeta, Error, Input, InputChangeEvent, Manager};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

use crate::client::Mqtt;

/// Builds the payload → channel-value command table from the configured
/// `on` and `off` payload lists.
pub fn command_map(on: Vec<String>, off: Vec<String>) -> HashMap<String, ChannelValue> {
    let mut commands = HashMap::new();
    for payload in on {
        commands.insert(payload, ChannelValue::FULL_ON);
    }
    for payload in off {
        commands.insert(payload, ChannelValue::OFF);
    }
    commands
}

/// One-channel input fed from a broker topic: configured payloads map to
/// on/off, anything else is ignored.
pub struct MqttSubscribe {
    meta: ComponentMeta,
    commands: HashMap<String, ChannelValue>,
    input_change: InputChangeEvent,
}

impl MqttSubscribe {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let mqtt: Rc<Mqtt> = manager.standalone(&meta, &properties.child("mqtt")?, "mqtt client")?;
        let topic: String = properties.get("topic")?;
        let commands = command_map(properties.get("on")?, properties.get("off")?);

        let input = Rc::new(MqttSubscribe {
            meta,
            commands,
            input_change: InputChangeEvent::new(),
        });
        let weak = Rc::downgrade(&input);
        mqtt.subscribe(topic, move |payload| {
            if let Some(input) = weak.upgrade() {
                input.receive(payload);
            }
        });
        Ok(input)
    }

    fn receive(&self, payload: &str) {
        if let Some(&value) = self.commands.get(payload) {
            self.input_change.fire(&ChannelBuffer::from(value));
        }
    }
}

impl Component for MqttSubscribe {
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

impl Input for MqttSubscribe {
    fn emits_channels(&self) -> usize {
        1
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}
