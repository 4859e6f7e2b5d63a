use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

use tracing::debug;

use core_properties::{FromProperty, PropertyNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pull {
    #[default]
    Off,
    Up,
    Down,
}

impl FromProperty for Pull {
    const EXPECTED: &'static str = "one of \"off\", \"up\", \"down\"";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        match node.json().as_str()? {
            "off" => Some(Pull::Off),
            "up" => Some(Pull::Up),
            "down" => Some(Pull::Down),
            _ => None,
        }
    }
}

/// Seam to the pin hardware. The daemon only ever talks to this trait;
/// real drivers live behind it, out of scope of the graph.
pub trait GpioDriver: 'static {
    fn setup(&self) -> io::Result<()>;
    fn pin_mode(&self, pin: u16, mode: PinMode);
    fn pull_up_down(&self, pin: u16, pull: Pull);
    fn digital_read(&self, pin: u16) -> bool;
    fn soft_pwm_create(&self, pin: u16);
    fn soft_pwm_write(&self, pin: u16, value: u16);
}

/// In-memory driver for development and tests: pin levels are plain
/// state, writable from test code and the process itself.
#[derive(Default)]
pub struct StubGpioDriver {
    levels: RefCell<HashMap<u16, bool>>,
    duty_cycles: RefCell<HashMap<u16, u16>>,
}

impl StubGpioDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: sets the level `digital_read` reports for `pin`.
    pub fn set_level(&self, pin: u16, level: bool) {
        self.levels.borrow_mut().insert(pin, level);
    }

    /// Test hook: the last duty cycle written to `pin`.
    pub fn duty_cycle(&self, pin: u16) -> Option<u16> {
        self.duty_cycles.borrow().get(&pin).copied()
    }
}

impl GpioDriver for StubGpioDriver {
    fn setup(&self) -> io::Result<()> {
        Ok(())
    }

    fn pin_mode(&self, pin: u16, mode: PinMode) {
        debug!(target: "gpio.stub", pin, ?mode, "pin mode");
    }

    fn pull_up_down(&self, pin: u16, pull: Pull) {
        debug!(target: "gpio.stub", pin, ?pull, "pull");
    }

    fn digital_read(&self, pin: u16) -> bool {
        self.levels.borrow().get(&pin).copied().unwrap_or(false)
    }

    fn soft_pwm_create(&self, pin: u16) {
        self.duty_cycles.borrow_mut().insert(pin, 0);
    }

    fn soft_pwm_write(&self, pin: u16, value: u16) {
        self.duty_cycles.borrow_mut().insert(pin, value);
    }
}
