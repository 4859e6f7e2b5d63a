use std::any::Any;
use std::rc::Rc;

use core_graph::{bind_input, Component, ComponentMeta, Error, Manager, Output};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

use crate::client::Mqtt;

/// Publishes the first channel's on/off state to a broker topic.
pub struct MqttPublish {
    meta: ComponentMeta,
    mqtt: Rc<Mqtt>,
    topic: String,
}

impl MqttPublish {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let mqtt: Rc<Mqtt> = manager.standalone(&meta, &properties.child("mqtt")?, "mqtt client")?;
        let output = Rc::new(MqttPublish {
            meta,
            mqtt,
            topic: properties.get("topic")?,
        });
        let as_output: Rc<dyn Output> = output.clone();
        bind_input(manager, &as_output, &properties.child("input")?)?;
        Ok(output)
    }
}

impl Component for MqttPublish {
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

impl Output for MqttPublish {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels >= 1
    }

    fn set(&self, _source: &ComponentMeta, values: &ChannelBuffer) {
        let payload = if values.get(0).on() { "ON" } else { "OFF" };
        self.mqtt.publish(self.topic.clone(), payload.into(), false);
    }
}
