use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, warn};

use core_graph::{
    bind_input, Component, ComponentMeta, Error, Input, InputChangeEvent, Manager, Output,
};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

type ToggleHandler = Box<dyn Fn()>;

/// Stdin line reader. Each line names a tag; the device registered under
/// that tag gets toggled.
pub struct Console {
    meta: ComponentMeta,
    devices: RefCell<HashMap<String, ToggleHandler>>,
}

impl Console {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        _properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let console = Rc::new(Console {
            meta,
            devices: RefCell::new(HashMap::new()),
        });
        let weak = Rc::downgrade(&console);
        manager.ready_event().subscribe_once(move |_| {
            tokio::task::spawn_local(read_stdin(weak.clone()));
        });
        Ok(console)
    }

    /// Registers a toggle handler under `tag`.
    pub fn register(&self, tag: String, handler: impl Fn() + 'static) {
        if self
            .devices
            .borrow_mut()
            .insert(tag.clone(), Box::new(handler))
            .is_some()
        {
            warn!(target: "console", tag = %tag, "console tag registered twice, keeping the last");
        }
    }

    /// Toggles the device registered under `tag`, as if its tag had been
    /// typed on the console.
    pub fn dispatch(&self, tag: &str) {
        match self.devices.borrow().get(tag) {
            Some(handler) => handler(),
            None => {
                error!(target: "console", tag = %tag, "requested input toggle on unknown console device");
            }
        }
    }
}

async fn read_stdin(console: Weak<Console>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(console) = console.upgrade() else {
                    return;
                };
                console.dispatch(line.trim_end());
            }
            Ok(None) => return,
            Err(error) => {
                error!(target: "console", %error, "read error from stdin");
                return;
            }
        }
    }
}

impl Component for Console {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Boolean channel toggled from the console: each dispatch of its tag
/// flips the value.
pub struct ConsoleInput {
    meta: ComponentMeta,
    tag: String,
    value: Cell<bool>,
    input_change: InputChangeEvent,
}

impl ConsoleInput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let console: Rc<Console> =
            manager.standalone(&meta, &properties.child("console")?, "console")?;
        let input = Rc::new(ConsoleInput {
            meta,
            tag: properties.get("tag")?,
            value: Cell::new(false),
            input_change: InputChangeEvent::new(),
        });
        let weak = Rc::downgrade(&input);
        console.register(input.tag.clone(), move || {
            if let Some(input) = weak.upgrade() {
                input.toggle();
            }
        });
        Ok(input)
    }

    fn toggle(&self) {
        let value = !self.value.get();
        self.value.set(value);
        debug!(target: "console", tag = %self.tag, value, "console input toggled");
        self.input_change
            .fire(&ChannelBuffer::from(ChannelValue::from(value)));
    }
}

impl Component for ConsoleInput {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_input(self: Rc<Self>) -> Option<Rc<dyn Input>> {
        Some(self)
    }
}

impl Input for ConsoleInput {
    fn emits_channels(&self) -> usize {
        1
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}

/// Prints every received buffer under its tag.
pub struct ConsoleOutput {
    meta: ComponentMeta,
    tag: String,
}

impl ConsoleOutput {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let output = Rc::new(ConsoleOutput {
            tag: properties.get_or("tag", meta.id.clone())?,
            meta,
        });
        let as_output: Rc<dyn Output> = output.clone();
        bind_input(manager, &as_output, &properties.child("input")?)?;
        Ok(output)
    }
}

impl Component for ConsoleOutput {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_output(self: Rc<Self>) -> Option<Rc<dyn Output>> {
        Some(self)
    }
}

impl Output for ConsoleOutput {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn set(&self, _source: &ComponentMeta, values: &ChannelBuffer) {
        println!("{}: {}", self.tag, values);
    }
}
