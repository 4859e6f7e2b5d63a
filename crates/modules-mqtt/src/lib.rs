//! modules-mqtt: broker integration.
//!
//! The standalone [`Mqtt`] client owns the connection: it queues
//! publications and remembers subscriptions while disconnected, replays
//! both once the broker acknowledges the session, announces itself on the
//! will topic, and retries with exponential backoff. `input:mqtt` maps
//! configured payloads to channel values; `output:mqtt` publishes the
//! first channel's on/off state.

use core_graph::{Category, ComponentFactory, Error};

mod client;
mod publish;
mod subscribe;

pub use client::{backoff_delay, Mqtt};
pub use publish::MqttPublish;
pub use subscribe::{command_map, MqttSubscribe};

pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "mqtt", Mqtt::create)?;
    factory.register(Category::Input, "mqtt", MqttSubscribe::create)?;
    factory.register(Category::Output, "mqtt", MqttPublish::create)?;
    Ok(())
}
