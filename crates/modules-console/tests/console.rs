//! Console subsystem: tag dispatch toggles the registered input device.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use core_graph::{ComponentFactory, Manager};
use core_properties::Properties;
use core_types::ChannelValue;
use modules_console::Console;

fn build(config: serde_json::Value) -> Manager {
    let mut factory = ComponentFactory::new();
    modules_console::register(&mut factory).unwrap();
    Manager::new(factory, &Properties::from_value(config)).unwrap()
}

#[test]
fn console_input_toggles_per_dispatch() {
    let manager = build(json!({
        "components": [
            {"type": "standalone:console", "id": "term"},
            {"type": "input:console", "id": "kitchen", "console": "term", "tag": "kitchen"},
        ]
    }));

    let seen: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let input = manager.find("kitchen").unwrap().as_input().unwrap();
    input.input_change_event().subscribe(move |values| {
        sink.borrow_mut()
            .extend(values.iter().map(ChannelValue::get));
    });

    let console: Rc<Console> = manager.find("term").unwrap().as_any().downcast().unwrap();
    console.dispatch("kitchen");
    console.dispatch("kitchen");
    console.dispatch("hallway"); // unknown tag, logged and ignored
    console.dispatch("kitchen");

    assert_eq!(*seen.borrow(), vec![100.0, 0.0, 100.0]);
}
