use std::any::Any;
use std::rc::Rc;

use core_graph::{Component, ComponentMeta, Error, Manager};
use core_properties::{FromProperty, PropertyNode};

use crate::driver::{GpioDriver, PinMode, Pull, StubGpioDriver};

enum DriverKind {
    Stub,
}

impl FromProperty for DriverKind {
    const EXPECTED: &'static str = "one of \"stub\"";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        match node.json().as_str()? {
            "stub" => Some(DriverKind::Stub),
            _ => None,
        }
    }
}

/// Owner of the pin driver. Pin configuration requests are deferred to
/// the ready event so the driver initializes exactly once, after the
/// whole graph exists.
pub struct GpioBus {
    meta: ComponentMeta,
    driver: Rc<dyn GpioDriver>,
}

impl GpioBus {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let driver: Rc<dyn GpioDriver> = match properties.get_or("driver", "stub")? {
            DriverKind::Stub => Rc::new(StubGpioDriver::new()),
        };
        Ok(Self::with_driver(manager, meta, driver))
    }

    pub fn with_driver(
        manager: &Manager,
        meta: ComponentMeta,
        driver: Rc<dyn GpioDriver>,
    ) -> Rc<Self> {
        let bus = Rc::new(GpioBus { meta, driver });
        let setup_driver = Rc::downgrade(&bus.driver);
        let errors = manager.startup_errors();
        manager.ready_event().subscribe_once(move |_| {
            let Some(driver) = setup_driver.upgrade() else {
                return;
            };
            if let Err(error) = driver.setup() {
                errors.report(error.into());
            }
        });
        bus
    }

    /// Configures `pin` as a digital input at ready time.
    pub fn request_input_pin(&self, manager: &Manager, pin: u16, pull: Pull) {
        let driver = Rc::downgrade(&self.driver);
        manager.ready_event().subscribe_once(move |_| {
            if let Some(driver) = driver.upgrade() {
                driver.pin_mode(pin, PinMode::Input);
                driver.pull_up_down(pin, pull);
            }
        });
    }

    /// Configures `pin` as a soft-PWM output at ready time.
    pub fn request_pwm_pin(&self, manager: &Manager, pin: u16) {
        let driver = Rc::downgrade(&self.driver);
        manager.ready_event().subscribe_once(move |_| {
            if let Some(driver) = driver.upgrade() {
                driver.pin_mode(pin, PinMode::Output);
                driver.soft_pwm_create(pin);
            }
        });
    }

    pub fn digital_read(&self, pin: u16) -> bool {
        self.driver.digital_read(pin)
    }

    pub fn soft_pwm_write(&self, pin: u16, value: u16) {
        self.driver.soft_pwm_write(pin, value);
    }
}

impl Component for GpioBus {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
