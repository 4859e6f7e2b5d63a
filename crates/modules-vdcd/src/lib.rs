//! modules-vdcd: digital-home device bridge.
//!
//! Line-delimited JSON over TCP: the standalone [`Vdcd`] announces every
//! registered device, waits for the ok status, then reacts to `channel`
//! and `sync` messages from the server. `input:vdcd` surfaces one device
//! as a 1-channel input.

use core_graph::{Category, ComponentFactory, Error};

mod bridge;
mod input;
mod wire;

pub use bridge::{Vdcd, VdcdDevice};
pub use input::VdcdInput;
pub use wire::{tag_index, ChannelPush, InitMessage, ServerMessage, SyncedMessage};

pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "vdcd", Vdcd::create)?;
    factory.register(Category::Input, "vdcd", VdcdInput::create)?;
    Ok(())
}
