//! modules-ws281x: addressable LED strip plumbing.
//!
//! The strip hardware lives in a helper child process (the
//! `ws281x-server` subcommand); the parent's standalone [`Ws281x`] client
//! keeps the full strip image and streams whole frames over a local
//! socket using the line-oriented hex protocol. `output:ws281x` writes a
//! window of the strip.

use core_graph::{Category, ComponentFactory, Error};

mod client;
mod output;
mod protocol;
mod server;

pub use client::Ws281x;
pub use output::Ws281xOutput;
pub use protocol::{encode_frame, parse_frame, parse_handshake, ProtocolError, SEPARATOR};
pub use server::{run_server, LedStrip, SimLedStrip};

pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "ws281x", Ws281x::create)?;
    factory.register(Category::Output, "ws281x", Ws281xOutput::create)?;
    Ok(())
}
