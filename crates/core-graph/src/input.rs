use crate::component::Component;
use crate::InputChangeEvent;

/// Capability of components that produce channel values.
///
/// Firing [`Input::input_change_event`] on any state change is the
/// component's responsibility; scalar producers wrap their value into a
/// one-element buffer.
pub trait Input: Component {
    /// Number of channels every emitted buffer carries.
    fn emits_channels(&self) -> usize;

    fn input_change_event(&self) -> &InputChangeEvent;
}
