use anyhow::Result;
use tracing::info;

use modules_ws281x::{run_server, SimLedStrip};

/// Runs the LED helper: a single-threaded reactor around the accept loop,
/// stopped by SIGINT/SIGTERM. The simulated strip stands in for the real
/// driver, which stays out of the daemon's scope.
pub fn run(gpio_pin: u16, led_count: usize, port: u16) -> Result<()> {
    info!(
        target: "ws281x.server",
        gpio_pin,
        led_count,
        port,
        "ws281x server starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    runtime.block_on(local.run_until(serve(led_count, port)))?;

    info!(target: "ws281x.server", "ws281x server exiting");
    Ok(())
}

#[cfg(unix)]
async fn serve(led_count: usize, port: u16) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let strip = Box::new(SimLedStrip::new(led_count));

    tokio::select! {
        result = run_server(strip, port) => result?,
        _ = interrupt.recv() => info!(target: "ws281x.server", "received signal, shutting down"),
        _ = terminate.recv() => info!(target: "ws281x.server", "received signal, shutting down"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn serve(led_count: usize, port: u16) -> Result<()> {
    let strip = Box::new(SimLedStrip::new(led_count));
    tokio::select! {
        result = run_server(strip, port) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!(target: "ws281x.server", "received interrupt, shutting down");
        }
    }
    Ok(())
}
