use std::rc::Rc;

use core_types::ChannelBuffer;

use crate::component::Component;
use crate::connection::PipelineHandle;

/// Capability of components that rewrite a buffer on its way from an input
/// to an output. The component itself carries only shared configuration;
/// per-connection mutable state lives in the instances it hands out.
pub trait Transition: Component {
    fn accepts_channels(&self, channels: usize) -> bool;

    /// Channel count emitted for `channels` incoming ones.
    fn emits_channels(&self, channels: usize) -> usize;

    /// Fresh per-connection state.
    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance>;
}

/// Per-connection state of one transition. `transform` rewrites `values`
/// in place; the pipeline handle lets time-driven transitions replay the
/// chain on their own schedule without owning the connection.
pub trait TransitionInstance {
    fn transform(&mut self, pipeline: &PipelineHandle, values: &mut ChannelBuffer);
}
