//! schlazicontrol entrypoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use core_graph::{ComponentFactory, Manager};
use core_properties::Properties;

mod server;

/// CLI surface. The helper subcommand is internal: the daemon spawns it
/// for every configured LED strip.
#[derive(Parser, Debug)]
#[command(name = "schlazicontrol", version, about = "Home automation dataflow daemon")]
struct Args {
    /// Configuration document describing components and flows.
    #[arg(
        short = 'c',
        long = "config-file",
        default_value = "/etc/schlazicontrol.json"
    )]
    config_file: PathBuf,

    /// Append log output to this file instead of stderr.
    #[arg(short = 'l', long = "log-file")]
    log_file: Option<PathBuf>,

    /// Write the daemon pid to this file after startup.
    #[arg(short = 'p', long = "pid-file")]
    pid_file: Option<PathBuf>,

    /// Detach from the controlling terminal (POSIX only).
    #[cfg(unix)]
    #[arg(short = 'd', long = "daemonize")]
    daemonize: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// LED helper process owning the strip hardware.
    #[command(name = "ws281x-server", hide = true)]
    Ws281xServer {
        #[arg(long = "gpio-pin")]
        gpio_pin: u16,
        #[arg(long = "led-count")]
        led_count: usize,
        #[arg(long, default_value_t = 9999)]
        port: u16,
    },
}

fn configure_logging(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("log file path has no file name")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn write_pid_file(path: &PathBuf) -> Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))
        .with_context(|| format!("couldn't write pid file {}", path.display()))
}

/// Classic double fork; stdio and the working directory are released so
/// the daemon survives its terminal.
#[cfg(unix)]
fn daemonize() -> Result<()> {
    // SAFETY: plain fork/setsid/chdir sequence before any threads exist.
    unsafe {
        let pid = libc::fork();
        anyhow::ensure!(pid >= 0, "couldn't daemonize: fork failed");
        if pid > 0 {
            std::process::exit(0);
        }
        anyhow::ensure!(libc::setsid() != -1, "couldn't daemonize: setsid failed");
        let pid = libc::fork();
        anyhow::ensure!(pid >= 0, "couldn't daemonize: fork failed");
        if pid > 0 {
            std::process::exit(0);
        }
        anyhow::ensure!(
            libc::chdir(c"/".as_ptr()) != -1,
            "couldn't daemonize: chdir failed"
        );
        libc::umask(0);
        for fd in 0..3 {
            libc::close(fd);
        }
    }
    Ok(())
}

fn register_components(factory: &mut ComponentFactory) -> Result<(), core_graph::Error> {
    core_graph::register(factory)?;
    core_transitions::register(factory)?;
    modules_console::register(factory)?;
    modules_gpio::register(factory)?;
    modules_mqtt::register(factory)?;
    modules_vdcd::register(factory)?;
    modules_ws281x::register(factory)?;
    Ok(())
}

fn run_daemon(args: &Args) -> Result<()> {
    info!(target: "runtime", "schlazicontrol starting");

    let mut factory = ComponentFactory::new();
    register_components(&mut factory)?;

    let properties = Properties::load(&args.config_file)?;
    let manager = Manager::new(factory, &properties)?;

    manager.run()?;
    info!(target: "runtime", "schlazicontrol exiting");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Ws281xServer {
        gpio_pin,
        led_count,
        port,
    }) = &args.command
    {
        let _guard = configure_logging(args.log_file.as_ref())?;
        return server::run(*gpio_pin, *led_count, *port);
    }

    #[cfg(unix)]
    if args.daemonize {
        daemonize()?;
    }
    if let Some(pid_file) = &args.pid_file {
        write_pid_file(pid_file)?;
    }
    let _guard = configure_logging(args.log_file.as_ref())?;

    run_daemon(&args)
}
