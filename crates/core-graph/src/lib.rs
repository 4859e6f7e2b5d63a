//! core-graph: the component graph and its reactor.
//!
//! Components carry an identity of `(category, name, id)` and any subset of
//! the input/output/transition capabilities. The [`Manager`] owns every
//! component, the ready/poll broadcast events and the tick clock; the
//! [`ComponentFactory`] maps configured type tags to constructors;
//! [`Connection`] and [`MultiConnection`] thread channel buffers from
//! inputs through transition chains into outputs.

use std::time::Duration;

use core_events::Event;
use core_types::ChannelBuffer;

mod component;
mod connection;
mod error;
mod input;
mod manager;
mod multiconnection;
mod output;
mod process;
mod registry;
mod timer;
mod transition;

pub use component::{Category, Component, ComponentMeta};
pub use connection::{Connection, PipelineHandle, Retransfer};
pub use error::{Error, StartupErrors};
pub use input::Input;
pub use manager::Manager;
pub use multiconnection::MultiConnection;
pub use output::{bind_input, bind_resolved_input, Output};
pub use process::{HelperCommand, HelperProcess};
pub use registry::{ComponentFactory, Constructor};
pub use timer::Timer;
pub use transition::{Transition, TransitionInstance};

/// Fired once after construction, before the tick loop starts.
pub type ReadyEvent = Event<()>;
/// Fired on every tick with the real elapsed duration.
pub type PollEvent = Event<Duration>;
/// Fired by inputs whenever their value changes.
pub type InputChangeEvent = Event<ChannelBuffer>;

/// Registers the graph-level component types (`connection`,
/// `multiconnection`) with a factory.
pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "connection", Connection::create)?;
    factory.register(Category::Standalone, "multiconnection", MultiConnection::create)?;
    Ok(())
}
