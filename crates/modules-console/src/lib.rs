//! modules-console: the interactive console subsystem and the debug
//! output.
//!
//! The standalone [`Console`] reads stdin line by line; every line is a
//! tag dispatched to the device registered under it. `input:console`
//! toggles a boolean channel per dispatch, `output:console` prints the
//! buffers it receives, and `output:debug` logs them.

use core_graph::{Category, ComponentFactory, Error};

mod console;
mod debug;

pub use console::{Console, ConsoleInput, ConsoleOutput};
pub use debug::DebugOutput;

pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "console", Console::create)?;
    factory.register(Category::Input, "console", ConsoleInput::create)?;
    factory.register(Category::Output, "console", ConsoleOutput::create)?;
    factory.register(Category::Output, "debug", DebugOutput::create)?;
    Ok(())
}
