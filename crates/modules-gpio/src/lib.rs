//! modules-gpio: GPIO endpoints behind a driver seam.
//!
//! Concrete pin hardware stays out of scope; the standalone bus owns a
//! [`GpioDriver`] implementation and defers pin setup to the ready event.
//! `input:gpio` polls a pin per tick and fires on edges, `output:softPwm`
//! drives one pin per channel with the value as duty cycle.

use core_graph::{Category, ComponentFactory, Error};

mod bus;
mod driver;
mod input;
mod pwm;

pub use bus::GpioBus;
pub use driver::{GpioDriver, PinMode, Pull, StubGpioDriver};
pub use input::GpioInput;
pub use pwm::SoftPwmOutput;

pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Standalone, "gpio", GpioBus::create)?;
    factory.register(Category::Input, "gpio", GpioInput::create)?;
    factory.register(Category::Output, "softPwm", SoftPwmOutput::create)?;
    Ok(())
}
