use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::protocol::{parse_frame, SEPARATOR};

/// The strip hardware as seen by the helper process. Real drivers stay
/// behind this seam; the simulator below is what development builds run.
pub trait LedStrip {
    fn led_count(&self) -> usize;
    fn render(&mut self, pixels: &[u32]);
}

/// Logs frames instead of driving hardware.
pub struct SimLedStrip {
    led_count: usize,
    frames: u64,
}

impl SimLedStrip {
    pub fn new(led_count: usize) -> Self {
        SimLedStrip {
            led_count,
            frames: 0,
        }
    }
}

impl LedStrip for SimLedStrip {
    fn led_count(&self) -> usize {
        self.led_count
    }

    fn render(&mut self, pixels: &[u32]) {
        self.frames += 1;
        debug!(
            target: "ws281x.server",
            frame = self.frames,
            first = format_args!("{:06x}", pixels.first().copied().unwrap_or(0)),
            "frame rendered"
        );
    }
}

/// Accept loop of the helper process: one client at a time, `{n}` on
/// connect, then hex frames until disconnect or protocol violation, at
/// which point the socket closes and the loop accepts again.
pub async fn run_server(mut strip: Box<dyn LedStrip>, port: u16) -> io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(target: "ws281x.server", port, "waiting for connections");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(target: "ws281x.server", %peer, "connection accepted");
        if let Err(error) = serve_client(stream, strip.as_mut()).await {
            error!(target: "ws281x.server", %error, "socket error, restarting accept loop");
        }
    }
}

async fn serve_client(stream: TcpStream, strip: &mut dyn LedStrip) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(format!("{}{}", strip.led_count(), SEPARATOR).as_bytes())
        .await?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            info!(target: "ws281x.server", "client disconnected");
            return Ok(());
        }
        let Some(payload) = line.strip_suffix(SEPARATOR) else {
            error!(target: "ws281x.server", "protocol violation: message not terminated with separator");
            return Ok(());
        };
        match parse_frame(payload, strip.led_count()) {
            Ok(pixels) => strip.render(&pixels),
            Err(error) => {
                error!(target: "ws281x.server", %error, "protocol violation");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingStrip {
        led_count: usize,
        frames: Rc<RefCell<Vec<Vec<u32>>>>,
    }

    impl LedStrip for RecordingStrip {
        fn led_count(&self) -> usize {
            self.led_count
        }

        fn render(&mut self, pixels: &[u32]) {
            self.frames.borrow_mut().push(pixels.to_vec());
        }
    }

    async fn client(port: u16, frames: &[&str]) -> String {
        use tokio::io::AsyncReadExt;

        let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut handshake = String::new();
        reader.read_line(&mut handshake).await.unwrap();
        for frame in frames {
            write_half
                .write_all(format!("{frame}{SEPARATOR}").as_bytes())
                .await
                .unwrap();
        }
        // Wait for the server reaction: either it keeps the socket open or
        // closes it on a violation.
        let mut rest = Vec::new();
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            reader.read_to_end(&mut rest),
        )
        .await;
        handshake
    }

    #[tokio::test]
    async fn accepts_frames_and_survives_protocol_violations() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let frames = Rc::new(RefCell::new(Vec::new()));
                let strip = RecordingStrip {
                    led_count: 3,
                    frames: frames.clone(),
                };
                let port = 19999;
                tokio::task::spawn_local(async move {
                    let _ = run_server(Box::new(strip), port).await;
                });
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;

                // Well-formed frame.
                let handshake = client(port, &["ff000000ff000000ff"]).await;
                assert_eq!(handshake.trim_end(), "3");
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                assert_eq!(
                    *frames.borrow(),
                    vec![vec![0xff0000, 0x00ff00, 0x0000ff]]
                );

                // Malformed hex closes the socket; the accept loop
                // restarts and a new client connects fine.
                client(port, &["gghhiijjkkll000000"]).await;
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                let handshake = client(port, &["0000ff00ff00ff0000"]).await;
                assert_eq!(handshake.trim_end(), "3");
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                assert_eq!(frames.borrow().len(), 2);
            })
            .await;
    }
}
