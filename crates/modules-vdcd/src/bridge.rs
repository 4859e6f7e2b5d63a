use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use core_graph::{Component, ComponentMeta, Error, Manager};
use core_properties::PropertyNode;

use crate::wire::{tag_index, ChannelPush, InitMessage, ServerMessage, SyncedMessage};

const RETRY_DELAY: Duration = Duration::from_secs(1);

type ChangeHandler = Box<dyn Fn(f64)>;

/// One announced device: the static descriptor plus the cached value and
/// the change callback of the owning input component.
pub struct VdcdDevice {
    pub name: String,
    pub dsuid: String,
    pub group: i64,
    pub output_type: Option<String>,
    pub dimmable: bool,
    value: Cell<f64>,
    on_change: ChangeHandler,
}

/// Digital-home bridge speaking line-delimited JSON over TCP: announces
/// every registered device, then dispatches `channel`/`sync` messages and
/// answers sync requests with the cached value.
pub struct Vdcd {
    meta: ComponentMeta,
    host: String,
    port: u16,
    devices: RefCell<Vec<VdcdDevice>>,
}

impl Vdcd {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let vdcd = Rc::new(Vdcd {
            meta,
            host: properties.get("host")?,
            port: properties.get_or("port", 8999)?,
            devices: RefCell::new(Vec::new()),
        });
        let weak = Rc::downgrade(&vdcd);
        manager.ready_event().subscribe_once(move |_| {
            tokio::task::spawn_local(run_bridge(weak.clone()));
        });
        Ok(vdcd)
    }

    /// Registers a device; returns the tag used on the wire.
    pub fn register_device(
        &self,
        name: String,
        dsuid: String,
        group: i64,
        output_type: Option<String>,
        dimmable: bool,
        on_change: impl Fn(f64) + 'static,
    ) -> usize {
        let mut devices = self.devices.borrow_mut();
        devices.push(VdcdDevice {
            name,
            dsuid,
            group,
            output_type,
            dimmable,
            value: Cell::new(0.0),
            on_change: Box::new(on_change),
        });
        devices.len() - 1
    }

    fn set_value(&self, tag: usize, value: f64) {
        let devices = self.devices.borrow();
        let Some(device) = devices.get(tag) else {
            error!(target: "vdcd", tag, "channel message for unknown device");
            return;
        };
        if device.value.get() != value {
            device.value.set(value);
            (device.on_change)(value);
        }
    }

    fn value(&self, tag: usize) -> Option<f64> {
        self.devices
            .borrow()
            .get(tag)
            .map(|device| device.value.get())
    }
}

async fn send_line<T: serde::Serialize>(
    writer: &mut OwnedWriteHalf,
    message: &T,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(message).map_err(std::io::Error::other)?;
    debug!(target: "vdcd", line = %line, "<<<");
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}

async fn run_bridge(vdcd: Weak<Vdcd>) {
    let (host, port) = {
        let Some(vdcd) = vdcd.upgrade() else { return };
        (vdcd.host.clone(), vdcd.port)
    };

    loop {
        info!(target: "vdcd", host = %host, port, "connecting to vdcd");
        match serve(&host, port, &vdcd).await {
            Ok(()) => return,
            Err(error) => {
                error!(target: "vdcd", %error, "socket error in vdcd client");
            }
        }
        if vdcd.strong_count() == 0 {
            return;
        }
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

async fn serve(host: &str, port: u16, vdcd: &Weak<Vdcd>) -> std::io::Result<()> {
    let stream = TcpStream::connect((host, port)).await?;
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Handshake: one init descriptor per device, then the status reply.
    {
        let Some(vdcd) = vdcd.upgrade() else { return Ok(()) };
        let devices = vdcd.devices.borrow();
        let init: Vec<InitMessage<'_>> = devices
            .iter()
            .enumerate()
            .map(|(tag, device)| InitMessage {
                message: "init",
                name: &device.name,
                tag: tag.to_string(),
                uniqueid: &device.dsuid,
                group: device.group,
                sync: true,
                output: device.output_type.as_deref(),
                dimmable: device.output_type.as_ref().map(|_| device.dimmable),
            })
            .collect();
        send_line(&mut writer, &init).await?;
    }

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    debug!(target: "vdcd", line = %line.trim_end(), ">>>");
    match serde_json::from_str(line.trim_end()) {
        Ok(ServerMessage::Status { status, .. }) if status == "ok" => {
            info!(target: "vdcd", "connection to vdcd established");
        }
        Ok(ServerMessage::Status { errormessage, .. }) => {
            error!(target: "vdcd", error = ?errormessage, "message from vdcd");
            return Err(std::io::Error::other("handshake rejected"));
        }
        _ => {
            error!(target: "vdcd", "couldn't read from vdcd: invalid JSON message");
            return Err(std::io::Error::other("invalid handshake"));
        }
    }

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(std::io::Error::other("connection closed"));
        }
        let text = line.trim_end();
        debug!(target: "vdcd", line = %text, ">>>");
        let Some(vdcd) = vdcd.upgrade() else { return Ok(()) };

        match serde_json::from_str(text) {
            Ok(ServerMessage::Channel { tag, value }) => match tag_index(&tag) {
                Some(tag) => vdcd.set_value(tag, value),
                None => error!(target: "vdcd", "channel message with malformed tag"),
            },
            Ok(ServerMessage::Sync { tag }) => {
                let Some(tag) = tag_index(&tag) else {
                    error!(target: "vdcd", "sync message with malformed tag");
                    continue;
                };
                let Some(value) = vdcd.value(tag) else {
                    error!(target: "vdcd", tag, "sync request for unknown device");
                    continue;
                };
                send_line(
                    &mut writer,
                    &ChannelPush {
                        message: "channel",
                        tag: tag.to_string(),
                        index: 0,
                        value,
                    },
                )
                .await?;
                send_line(
                    &mut writer,
                    &SyncedMessage {
                        message: "synced",
                        tag: tag.to_string(),
                    },
                )
                .await?;
            }
            Ok(ServerMessage::Status { .. }) | Err(_) => {
                error!(target: "vdcd", "unexpected message from vdcd");
                return Err(std::io::Error::other("unexpected message"));
            }
        }
    }
}

impl Component for Vdcd {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
