use std::rc::Rc;

use core_properties::PropertyNode;
use core_types::ChannelBuffer;

use crate::component::{Component, ComponentMeta};
use crate::error::Error;
use crate::input::Input;
use crate::manager::Manager;

/// Capability of components that consume channel values.
pub trait Output: Component {
    fn accepts_channels(&self, channels: usize) -> bool;

    /// Receives a buffer from one of the bound inputs.
    fn set(&self, source: &ComponentMeta, values: &ChannelBuffer);
}

/// Resolves the input named by `node` and wires it to `output`.
///
/// The channel-count check and the subscription run from a one-shot ready
/// handler, once every component of the graph exists; a mismatch is
/// reported to the manager's startup-error sink and aborts the run before
/// the tick loop starts.
pub fn bind_input(
    manager: &mut Manager,
    output: &Rc<dyn Output>,
    node: &PropertyNode<'_>,
) -> Result<Rc<dyn Input>, Error> {
    let input = manager.input(output.meta(), node)?;
    bind_resolved_input(manager, output, &input);
    Ok(input)
}

/// Wires an already-resolved input to `output` at ready time.
pub fn bind_resolved_input(manager: &Manager, output: &Rc<dyn Output>, input: &Rc<dyn Input>) {
    let errors = manager.startup_errors();
    let weak_output = Rc::downgrade(output);
    let weak_input = Rc::downgrade(input);
    manager.ready_event().subscribe_once(move |_| {
        let (Some(output), Some(input)) = (weak_output.upgrade(), weak_input.upgrade()) else {
            return;
        };
        let channels = input.emits_channels();
        if !output.accepts_channels(channels) {
            errors.report(Error::ChannelCountMismatch {
                sender: input.meta().describe(),
                receiver: output.meta().describe(),
                channels,
            });
            return;
        }
        let weak_output = Rc::downgrade(&output);
        let source = input.meta().clone();
        input.input_change_event().subscribe(move |values: &ChannelBuffer| {
            if let Some(output) = weak_output.upgrade() {
                output.set(&source, values);
            }
        });
    });
}
