use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tracing::{debug, error, info};

use core_graph::{Component, ComponentMeta, Error, Manager};
use core_properties::PropertyNode;

pub type MessageHandler = Box<dyn Fn(&str)>;

struct Publication {
    topic: String,
    payload: String,
    retain: bool,
}

/// Exponential backoff for reconnect attempts: `2^retries` seconds.
pub fn backoff_delay(retries: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(retries))
}

/// Broker client. Connection management is internal; components publish
/// and subscribe through it and never see the session state.
pub struct Mqtt {
    meta: ComponentMeta,
    host: String,
    port: u16,
    client_id: String,
    will_topic: String,
    client: RefCell<Option<AsyncClient>>,
    connected: Cell<bool>,
    retries: Cell<u32>,
    subscriptions: RefCell<Vec<(String, MessageHandler)>>,
    pending: RefCell<Vec<Publication>>,
}

impl Mqtt {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let mqtt = Rc::new(Mqtt {
            meta,
            host: properties.get("host")?,
            port: properties.get_or("port", 1883)?,
            client_id: properties.get_or("clientId", "")?,
            will_topic: properties.get_or("willTopic", "")?,
            client: RefCell::new(None),
            connected: Cell::new(false),
            retries: Cell::new(0),
            subscriptions: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        });
        let weak = Rc::downgrade(&mqtt);
        manager.ready_event().subscribe_once(move |_| {
            if let Some(mqtt) = weak.upgrade() {
                mqtt.connect();
            }
        });
        Ok(mqtt)
    }

    fn connect(self: &Rc<Self>) {
        info!(target: "mqtt", host = %self.host, port = self.port, "connecting to broker");

        let client_id = if self.client_id.is_empty() {
            format!("schlazicontrol.{}", std::process::id())
        } else {
            self.client_id.clone()
        };
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(60));
        if !self.will_topic.is_empty() {
            options.set_last_will(LastWill::new(
                self.will_topic.clone(),
                "NO",
                QoS::AtLeastOnce,
                true,
            ));
        }

        let (client, event_loop) = AsyncClient::new(options, 16);
        *self.client.borrow_mut() = Some(client);
        tokio::task::spawn_local(run_event_loop(Rc::downgrade(self), event_loop));
    }

    fn on_connect(&self) {
        info!(target: "mqtt", "connection established successfully");
        self.connected.set(true);
        self.retries.set(0);

        if !self.will_topic.is_empty() {
            self.do_publish(&self.will_topic, "YES", true);
        }
        for (topic, _) in self.subscriptions.borrow().iter() {
            self.do_subscribe(topic);
        }
        for publication in self.pending.borrow_mut().drain(..) {
            self.do_publish(&publication.topic, &publication.payload, publication.retain);
        }
    }

    fn on_disconnect(&self) -> Duration {
        self.connected.set(false);
        let delay = backoff_delay(self.retries.get());
        self.retries.set(self.retries.get() + 1);
        delay
    }

    fn on_message(&self, topic: &str, payload: &str) {
        debug!(target: "mqtt", topic, payload, "received message");
        for (subscribed, handler) in self.subscriptions.borrow().iter() {
            if subscribed == topic {
                handler(payload);
            }
        }
    }

    /// Publishes now if connected, otherwise queues until the session is
    /// (re)established.
    pub fn publish(&self, topic: String, payload: String, retain: bool) {
        if self.connected.get() {
            self.do_publish(&topic, &payload, retain);
        } else {
            debug!(target: "mqtt", topic = %topic, "registering publication");
            self.pending.borrow_mut().push(Publication {
                topic,
                payload,
                retain,
            });
        }
    }

    /// Registers a topic handler; the subscription survives reconnects.
    pub fn subscribe(&self, topic: String, handler: impl Fn(&str) + 'static) {
        debug!(target: "mqtt", topic = %topic, "registering subscription");
        if self.connected.get() {
            self.do_subscribe(&topic);
        }
        self.subscriptions
            .borrow_mut()
            .push((topic, Box::new(handler)));
    }

    fn do_publish(&self, topic: &str, payload: &str, retain: bool) {
        info!(target: "mqtt", topic, payload, "publishing");
        if let Some(client) = self.client.borrow().as_ref() {
            if let Err(error) = client.try_publish(topic, QoS::AtLeastOnce, retain, payload) {
                error!(target: "mqtt", topic, %error, "couldn't publish");
            }
        }
    }

    fn do_subscribe(&self, topic: &str) {
        info!(target: "mqtt", topic, "subscribing to topic");
        if let Some(client) = self.client.borrow().as_ref() {
            if let Err(error) = client.try_subscribe(topic, QoS::AtMostOnce) {
                error!(target: "mqtt", topic, %error, "couldn't subscribe");
            }
        }
    }
}

async fn run_event_loop(mqtt: Weak<Mqtt>, mut event_loop: rumqttc::EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                let Some(mqtt) = mqtt.upgrade() else { return };
                mqtt.on_connect();
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(mqtt) = mqtt.upgrade() else { return };
                let payload = String::from_utf8_lossy(&publish.payload);
                mqtt.on_message(&publish.topic, &payload);
            }
            Ok(_) => {}
            Err(error) => {
                let Some(mqtt) = mqtt.upgrade() else { return };
                let delay = mqtt.on_disconnect();
                error!(
                    target: "mqtt",
                    %error,
                    retry_in = ?delay,
                    "connection lost, retrying automatically"
                );
                drop(mqtt);
                tokio::time::sleep(delay).await;
            }
        }
        if mqtt.strong_count() == 0 {
            return;
        }
    }
}

impl Component for Mqtt {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
