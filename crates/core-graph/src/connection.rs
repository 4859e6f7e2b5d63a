use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use core_properties::PropertyNode;
use core_types::ChannelBuffer;

use crate::component::{Component, ComponentMeta};
use crate::error::Error;
use crate::input::Input;
use crate::manager::Manager;
use crate::output::Output;
use crate::transition::TransitionInstance;
use crate::InputChangeEvent;

/// Anything a transition may ask to replay its chain. Implemented by
/// [`Connection`]; tests substitute their own harness.
pub trait Retransfer {
    fn retransfer(self: Rc<Self>);
}

/// Non-owning handle to a pipeline, safe for transition instances and
/// timers to hold across reactor callbacks.
#[derive(Clone)]
pub struct PipelineHandle {
    target: Weak<dyn Retransfer>,
}

impl PipelineHandle {
    pub fn new(target: Weak<dyn Retransfer>) -> Self {
        PipelineHandle { target }
    }

    pub fn of(target: &Rc<impl Retransfer + 'static>) -> Self {
        PipelineHandle {
            target: Rc::downgrade(target) as Weak<dyn Retransfer>,
        }
    }

    /// Replays the chain with the cached last input; a no-op once the
    /// pipeline is gone.
    pub fn retransfer(&self) {
        if let Some(target) = self.target.upgrade() {
            target.retransfer();
        }
    }
}

/// A single-input dataflow: one input, an ordered transition chain, one
/// output. Channel counts are checked while the chain is assembled.
///
/// The connection also offers the input capability, emitting the fully
/// transformed buffer, so processed flows can fan into a
/// [`crate::MultiConnection`].
pub struct Connection {
    meta: ComponentMeta,
    output: Rc<dyn Output>,
    instances: RefCell<Vec<Box<dyn TransitionInstance>>>,
    channels: usize,
    last_input: RefCell<ChannelBuffer>,
    input_change: InputChangeEvent,
}

impl Connection {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let input = manager.input(&meta, &properties.child("input")?)?;

        let mut channels = input.emits_channels();
        let mut sender = input.meta().describe();
        let mut instances = Vec::new();
        for node in properties.child("transitions")?.iter()? {
            let transition = manager.transition(&meta, &node)?;
            if !transition.accepts_channels(channels) {
                return Err(Error::ChannelCountMismatch {
                    sender,
                    receiver: transition.meta().describe(),
                    channels,
                });
            }
            channels = transition.emits_channels(channels);
            sender = transition.meta().describe();
            instances.push(transition.instantiate());
        }

        let output = manager.output(&meta, &properties.child("output")?)?;
        if !output.accepts_channels(channels) {
            return Err(Error::ChannelCountMismatch {
                sender,
                receiver: output.meta().describe(),
                channels,
            });
        }

        let connection = Rc::new(Connection {
            meta,
            output,
            instances: RefCell::new(instances),
            channels,
            last_input: RefCell::new(ChannelBuffer::new()),
            input_change: InputChangeEvent::new(),
        });

        let weak = Rc::downgrade(&connection);
        input.input_change_event().subscribe(move |values: &ChannelBuffer| {
            if let Some(connection) = weak.upgrade() {
                connection.transfer(values);
            }
        });

        Ok(connection)
    }

    fn transfer(self: &Rc<Self>, values: &ChannelBuffer) {
        *self.last_input.borrow_mut() = values.clone();
        self.run_chain();
    }

    fn run_chain(self: &Rc<Self>) {
        let mut buffer = self.last_input.borrow().clone();
        let handle = PipelineHandle::of(self);
        {
            let Ok(mut instances) = self.instances.try_borrow_mut() else {
                // A transform re-entered its own chain; abandon the nested
                // transfer, the previous output stands.
                warn!(target: "graph.connection", id = %self.meta.id, "re-entrant transfer abandoned");
                return;
            };
            for instance in instances.iter_mut() {
                instance.transform(&handle, &mut buffer);
            }
        }
        debug!(target: "graph.connection", id = %self.meta.id, values = %buffer, "transfer");
        self.output.set(&self.meta, &buffer);
        self.input_change.fire(&buffer);
    }
}

impl Retransfer for Connection {
    fn retransfer(self: Rc<Self>) {
        self.run_chain();
    }
}

impl Component for Connection {
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

impl Input for Connection {
    fn emits_channels(&self) -> usize {
        self.channels
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}
