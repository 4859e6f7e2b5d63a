use std::any::Any;
use std::cell::RefCell;
use std::cmp;
use std::collections::HashMap;
use std::rc::Rc;

use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

use crate::component::{Component, ComponentMeta};
use crate::error::Error;
use crate::input::Input;
use crate::manager::Manager;
use crate::output::{bind_resolved_input, Output};
use crate::InputChangeEvent;

/// Fan-in: an output for each of its declared inputs and an input for
/// whatever sits downstream. Emits the element-wise maximum over the most
/// recent buffer of every source; shorter buffers contribute zero beyond
/// their end.
pub struct MultiConnection {
    meta: ComponentMeta,
    channels: usize,
    buffers: RefCell<HashMap<String, ChannelBuffer>>,
    input_change: InputChangeEvent,
}

impl MultiConnection {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let inputs_node = properties.child("inputs")?;
        let mut inputs = Vec::new();
        for node in inputs_node.iter()? {
            inputs.push(manager.input(&meta, &node)?);
        }
        let channels = inputs
            .iter()
            .map(|input| input.emits_channels())
            .max()
            .unwrap_or(0);

        let connection = Rc::new(MultiConnection {
            meta,
            channels,
            buffers: RefCell::new(HashMap::new()),
            input_change: InputChangeEvent::new(),
        });

        let as_output: Rc<dyn Output> = connection.clone();
        for input in &inputs {
            bind_resolved_input(manager, &as_output, input);
        }

        Ok(connection)
    }

    fn recompute(&self) -> ChannelBuffer {
        let buffers = self.buffers.borrow();
        (0..self.channels)
            .map(|index| {
                buffers
                    .values()
                    .map(|buffer| {
                        if index < buffer.len() {
                            buffer.get(index)
                        } else {
                            ChannelValue::OFF
                        }
                    })
                    .fold(ChannelValue::OFF, cmp::max)
            })
            .collect()
    }
}

impl Component for MultiConnection {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_input(self: Rc<Self>) -> Option<Rc<dyn Input>> {
        Some(self)
    }

    fn as_output(self: Rc<Self>) -> Option<Rc<dyn Output>> {
        Some(self)
    }
}

impl Input for MultiConnection {
    fn emits_channels(&self) -> usize {
        self.channels
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}

impl Output for MultiConnection {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn set(&self, source: &ComponentMeta, values: &ChannelBuffer) {
        self.buffers
            .borrow_mut()
            .insert(source.id.clone(), values.clone());
        let merged = self.recompute();
        self.input_change.fire(&merged);
    }
}
