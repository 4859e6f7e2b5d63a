//! core-transitions: the stateful value-stream transformations a
//! connection chains between its input and its output.
//!
//! Time-driven transitions (fade, animate) subscribe their per-connection
//! state to the manager's poll event and replay the chain through the
//! pipeline handle; triggers interpret configured event/outcome
//! expressions with poll-driven timers.

use core_graph::{Category, ComponentFactory, Error};

mod animate;
mod color;
mod fade;
mod multiply;
mod shift;
mod triggers;

pub use animate::{AnimateTransition, Animator, WavesAnimator};
pub use color::{FillColorTransition, GradientColorTransition};
pub use fade::FadeTransition;
pub use multiply::MultiplyTransition;
pub use shift::ShiftTransition;
pub use triggers::TriggersTransition;

/// Registers every transition type with a factory.
pub fn register(factory: &mut ComponentFactory) -> Result<(), Error> {
    factory.register(Category::Transition, "fade", FadeTransition::create)?;
    factory.register(Category::Transition, "animate:waves", animate::create_waves)?;
    factory.register(Category::Transition, "triggers", TriggersTransition::create)?;
    factory.register(Category::Transition, "color:fill", FillColorTransition::create)?;
    factory.register(Category::Transition, "color:gradient", GradientColorTransition::create)?;
    factory.register(Category::Transition, "shift", ShiftTransition::create)?;
    factory.register(Category::Transition, "multiply", MultiplyTransition::create)?;
    Ok(())
}
