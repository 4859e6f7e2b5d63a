//! GPIO endpoints against the stub driver: edge detection on polled pins
//! and duty-cycle writes through the soft-PWM output.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;

use core_graph::{Category, Component, ComponentFactory, ComponentMeta, Error, Manager};
use core_properties::{Properties, PropertyNode};
use core_types::ChannelValue;
use modules_gpio::{GpioBus, StubGpioDriver};

thread_local! {
    static STUB: RefCell<Option<Rc<StubGpioDriver>>> = const { RefCell::new(None) };
}

/// Registers a gpio bus backed by the shared test stub, so the test keeps
/// a handle to the pin state.
fn stub_bus(
    manager: &mut Manager,
    meta: ComponentMeta,
    _properties: &PropertyNode<'_>,
) -> Result<Rc<dyn Component>, Error> {
    let stub = STUB.with(|slot| slot.borrow().clone()).expect("stub installed");
    Ok(GpioBus::with_driver(manager, meta, stub))
}

fn build(config: serde_json::Value) -> (Manager, Rc<StubGpioDriver>) {
    let stub = Rc::new(StubGpioDriver::new());
    STUB.with(|slot| *slot.borrow_mut() = Some(stub.clone()));

    let mut factory = ComponentFactory::new();
    factory.register(Category::Standalone, "gpio", stub_bus).unwrap();
    factory
        .register(Category::Input, "gpio", modules_gpio::GpioInput::create)
        .unwrap();
    factory
        .register(Category::Output, "softPwm", modules_gpio::SoftPwmOutput::create)
        .unwrap();

    let manager = Manager::new(factory, &Properties::from_value(config)).unwrap();
    manager.ready_event().fire(&());
    assert!(manager.startup_errors().take_first().is_none());
    (manager, stub)
}

fn tick(manager: &Manager) {
    manager.poll_event().fire(&Duration::from_millis(40));
}

#[test]
fn gpio_input_fires_on_edges_only() {
    let (manager, stub) = build(json!({
        "components": [
            {"type": "standalone:gpio", "id": "bus"},
            {"type": "input:gpio", "id": "button", "gpio": "bus", "gpioPin": 4, "pull": "up"},
        ]
    }));

    let seen: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let input = manager
        .find("button")
        .unwrap()
        .as_input()
        .unwrap();
    input.input_change_event().subscribe(move |values| {
        sink.borrow_mut()
            .push(values.iter().map(ChannelValue::get).next().unwrap());
    });

    tick(&manager);
    assert!(seen.borrow().is_empty(), "no edge without a level change");

    stub.set_level(4, true);
    tick(&manager);
    tick(&manager);
    assert_eq!(*seen.borrow(), vec![100.0], "one event per rising edge");

    stub.set_level(4, false);
    tick(&manager);
    assert_eq!(*seen.borrow(), vec![100.0, 0.0]);
}

#[test]
fn soft_pwm_output_writes_duty_cycles() {
    let (manager, stub) = build(json!({
        "components": [
            {"type": "standalone:gpio", "id": "bus"},
            {"type": "input:gpio", "id": "button", "gpio": "bus", "gpioPin": 4},
            {
                "type": "output:softPwm",
                "id": "dimmer",
                "gpio": "bus",
                "gpioPins": [5],
                "input": "button"
            },
        ]
    }));

    assert_eq!(stub.duty_cycle(5), Some(0), "pwm pin created at ready");

    stub.set_level(4, true);
    tick(&manager);
    assert_eq!(stub.duty_cycle(5), Some(100));

    stub.set_level(4, false);
    tick(&manager);
    assert_eq!(stub.duty_cycle(5), Some(0));
}
