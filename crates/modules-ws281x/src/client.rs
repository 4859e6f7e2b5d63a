use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{error, info};

use core_graph::{Component, ComponentMeta, Error, HelperCommand, Manager};
use core_properties::PropertyNode;
use core_types::ChannelBuffer;

use crate::protocol::{encode_frame, parse_handshake, SEPARATOR};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Client side of the LED helper: keeps the full strip image, streams a
/// whole frame per update, and reconnects with a 1 s retry on any socket
/// or protocol error.
pub struct Ws281x {
    meta: ComponentMeta,
    gpio_pin: u16,
    led_count: usize,
    port: u16,
    values: RefCell<ChannelBuffer>,
    connected: Cell<bool>,
    frames: mpsc::UnboundedSender<String>,
    frame_source: RefCell<Option<mpsc::UnboundedReceiver<String>>>,
}

impl Ws281x {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let led_count: usize = properties.get("ledCount")?;
        let (frames, frame_source) = mpsc::unbounded_channel();
        let ws281x = Rc::new(Ws281x {
            meta,
            gpio_pin: properties.get("gpioPin")?,
            led_count,
            port: properties.get_or("port", 9999)?,
            values: RefCell::new(ChannelBuffer::zeroed(led_count * 3)),
            connected: Cell::new(false),
            frames,
            frame_source: RefCell::new(Some(frame_source)),
        });
        let weak = Rc::downgrade(&ws281x);
        manager.ready_event().subscribe_once(move |_| {
            let Some(ws281x) = weak.upgrade() else { return };
            let Some(frames) = ws281x.frame_source.borrow_mut().take() else {
                return;
            };
            tokio::task::spawn_local(run_client(Rc::downgrade(&ws281x), frames));
        });
        Ok(ws281x)
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Copies `values` into the strip image starting at LED `first` and
    /// streams the whole frame if the helper is reachable.
    pub fn send(&self, first: usize, values: &ChannelBuffer) {
        {
            let mut image = self.values.borrow_mut();
            for (index, value) in values.iter().enumerate() {
                image.set(first * 3 + index, value);
            }
        }
        if !self.connected.get() {
            return;
        }
        let frame = encode_frame(&self.values.borrow());
        let _ = self.frames.send(frame);
    }
}

async fn run_client(ws281x: Weak<Ws281x>, mut frames: mpsc::UnboundedReceiver<String>) {
    let (port, led_count) = {
        let Some(ws281x) = ws281x.upgrade() else { return };
        (ws281x.port, ws281x.led_count)
    };

    loop {
        info!(target: "ws281x", port, "connecting to ws281x server at localhost");
        match connect(port, led_count, &ws281x, &mut frames).await {
            Ok(()) => return,
            Err(error) => {
                if let Some(ws281x) = ws281x.upgrade() {
                    ws281x.connected.set(false);
                } else {
                    return;
                }
                error!(target: "ws281x", %error, "error in ws281x server communication");
            }
        }
        // Drop frames queued while unreachable; the next send carries the
        // complete image anyway.
        while frames.try_recv().is_ok() {}
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

async fn connect(
    port: u16,
    led_count: usize,
    ws281x: &Weak<Ws281x>,
    frames: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), std::io::Error> {
    let stream = TcpStream::connect(("127.0.0.1", port)).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let count = match parse_handshake(line.trim_end()) {
        Ok(count) => count,
        Err(error) => {
            error!(target: "ws281x", %error, "invalid handshake from ws281x server");
            return Err(std::io::Error::other(error));
        }
    };
    if count != led_count {
        error!(
            target: "ws281x",
            reported = count,
            expected = led_count,
            "ws281x server reports a different led count"
        );
        return Err(std::io::Error::other("led count mismatch"));
    }

    info!(target: "ws281x", "connection to ws281x server established");
    if let Some(ws281x) = ws281x.upgrade() {
        ws281x.connected.set(true);
    } else {
        return Ok(());
    }

    while let Some(frame) = frames.recv().await {
        write_half.write_all(frame.as_bytes()).await?;
        write_half.write_all(SEPARATOR.as_bytes()).await?;
    }
    Ok(())
}

impl Component for Ws281x {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn helper_process(&self) -> Option<HelperCommand> {
        Some(HelperCommand {
            name: format!("ws281x-server.{}", self.meta.id),
            args: vec![
                "ws281x-server".into(),
                "--gpio-pin".into(),
                self.gpio_pin.to_string(),
                "--led-count".into(),
                self.led_count.to_string(),
                "--port".into(),
                self.port.to_string(),
            ],
        })
    }
}
