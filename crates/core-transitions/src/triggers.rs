use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use core_expression::{parse_call, Argument, Call, ExpressionError};
use core_graph::{
    Component, ComponentMeta, Error, Manager, PipelineHandle, PollEvent, Timer, Transition,
    TransitionInstance,
};
use core_properties::PropertyNode;
use core_types::{ChannelBuffer, ChannelValue};

/// A channel-value predicate used by `change` events and `set` outcomes:
/// either an exact percent or one of the named levels.
#[derive(Debug, Clone, Copy)]
pub struct Value {
    value: ChannelValue,
    predicate: Predicate,
}

#[derive(Debug, Clone, Copy)]
enum Predicate {
    Equals,
    Off,
    On,
    FullOn,
}

impl Value {
    fn percent(percent: i64) -> Value {
        Value {
            value: ChannelValue::new(percent as f64),
            predicate: Predicate::Equals,
        }
    }

    fn named(name: &str) -> Option<Value> {
        let (value, predicate) = match name {
            "off" => (ChannelValue::OFF, Predicate::Off),
            "on" => (ChannelValue::FULL_ON, Predicate::On),
            "fullOn" => (ChannelValue::FULL_ON, Predicate::FullOn),
            _ => return None,
        };
        Some(Value { value, predicate })
    }

    fn get(&self) -> ChannelValue {
        self.value
    }

    fn matches(&self, other: ChannelValue) -> bool {
        match self.predicate {
            Predicate::Equals => self.value == other,
            Predicate::Off => other.off(),
            Predicate::On => other.on(),
            Predicate::FullOn => other.full_on(),
        }
    }
}

fn value_argument(call: &Call, index: usize) -> Result<Value, ExpressionError> {
    match &call.arguments[index] {
        Argument::Number(percent) if (0..=100).contains(percent) => Ok(Value::percent(*percent)),
        Argument::Number(_) => Err(call.argument_error(index, "percent out of range 0..100")),
        Argument::String(name) => Value::named(name)
            .ok_or_else(|| call.argument_error(index, "expected off, on or fullOn")),
    }
}

/// Condition side of an action.
enum TriggerEvent {
    /// Fires on the transition from "not matching" to "matching".
    Change(Value),
    /// Fires when the named timer has expired since the last evaluation.
    Timeout(u32),
}

/// Effect side of an action.
enum Outcome {
    Set(Value),
    StartTimer(u32, Duration),
    StopTimer(u32),
}

struct Action {
    event: TriggerEvent,
    outcomes: Vec<Outcome>,
}

fn parse_event(text: &str) -> Result<TriggerEvent, ExpressionError> {
    let call = parse_call(text)?;
    match call.function.as_str() {
        "change" => {
            call.expect_arity(1)?;
            Ok(TriggerEvent::Change(value_argument(&call, 0)?))
        }
        "timeout" => {
            call.expect_arity(1)?;
            Ok(TriggerEvent::Timeout(call.argument(0)?))
        }
        _ => Err(ExpressionError::UnknownFunction {
            function: call.function,
        }),
    }
}

fn parse_outcome(text: &str) -> Result<Outcome, ExpressionError> {
    let call = parse_call(text)?;
    match call.function.as_str() {
        "set" => {
            call.expect_arity(1)?;
            Ok(Outcome::Set(value_argument(&call, 0)?))
        }
        "startTimer" => {
            call.expect_arity(2)?;
            Ok(Outcome::StartTimer(call.argument(0)?, call.argument(1)?))
        }
        "stopTimer" => {
            call.expect_arity(1)?;
            Ok(Outcome::StopTimer(call.argument(0)?))
        }
        _ => Err(ExpressionError::UnknownFunction {
            function: call.function,
        }),
    }
}

fn parse_actions(node: &PropertyNode<'_>) -> Result<Vec<Action>, Error> {
    let mut actions = Vec::new();
    for action_node in node.iter()? {
        let event = parse_event(&action_node.get::<String>("event")?)?;
        let mut outcomes = Vec::new();
        for outcome in action_node.get::<Vec<String>>("outcomes")? {
            outcomes.push(parse_outcome(&outcome)?);
        }
        actions.push(Action { event, outcomes });
    }
    Ok(actions)
}

/// Event-outcome interpreter over the first channel: configured actions
/// react to value changes and timer expirations, and the emitted value is
/// whatever the last `set` outcome chose.
pub struct TriggersTransition {
    meta: ComponentMeta,
    poll_event: PollEvent,
    actions: Vec<Action>,
}

impl TriggersTransition {
    pub fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let actions = parse_actions(&properties.child("actions")?)?;
        Ok(Rc::new(TriggersTransition {
            meta,
            poll_event: manager.poll_event().clone(),
            actions,
        }))
    }

    /// Construction from pre-split expression strings, without a manager.
    pub fn from_expressions(
        meta: ComponentMeta,
        poll_event: PollEvent,
        actions: &[(&str, &[&str])],
    ) -> Result<Rc<Self>, Error> {
        let mut parsed = Vec::new();
        for (event, outcomes) in actions {
            parsed.push(Action {
                event: parse_event(event)?,
                outcomes: outcomes
                    .iter()
                    .map(|outcome| parse_outcome(outcome))
                    .collect::<Result<_, _>>()?,
            });
        }
        Ok(Rc::new(TriggersTransition {
            meta,
            poll_event,
            actions: parsed,
        }))
    }
}

impl Component for TriggersTransition {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn as_transition(self: Rc<Self>) -> Option<Rc<dyn Transition>> {
        Some(self)
    }
}

/// Timer state shared with the expiration callbacks parked in the poll
/// event.
#[derive(Default)]
struct TriggerShared {
    timers: RefCell<HashMap<u32, Timer>>,
    expired: RefCell<HashSet<u32>>,
}

struct TriggersInstance {
    transition: Rc<TriggersTransition>,
    shared: Rc<TriggerShared>,
    last_input: ChannelValue,
    output: ChannelValue,
}

struct Context<'a> {
    shared: &'a Rc<TriggerShared>,
    poll_event: &'a PollEvent,
    pipeline: &'a PipelineHandle,
    input: ChannelValue,
    last_input: ChannelValue,
    output: &'a mut ChannelValue,
}

impl Context<'_> {
    fn applies(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::Change(value) => {
                !value.matches(self.last_input) && value.matches(self.input)
            }
            TriggerEvent::Timeout(timer) => self.shared.expired.borrow_mut().remove(timer),
        }
    }

    fn invoke(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Set(value) => {
                debug!(target: "transition.triggers", value = %value.get(), "set");
                *self.output = value.get();
            }
            Outcome::StartTimer(timer, timeout) => {
                self.start_timer(*timer, *timeout);
            }
            Outcome::StopTimer(timer) => {
                self.shared.timers.borrow_mut().remove(timer);
            }
        }
    }

    fn start_timer(&self, timer: u32, timeout: Duration) {
        let weak: Weak<TriggerShared> = Rc::downgrade(self.shared);
        let pipeline = self.pipeline.clone();
        let id = timer;
        let handler = move || {
            if let Some(shared) = weak.upgrade() {
                shared.timers.borrow_mut().remove(&id);
                shared.expired.borrow_mut().insert(id);
            }
            pipeline.retransfer();
        };
        self.shared
            .timers
            .borrow_mut()
            .insert(timer, Timer::new(self.poll_event, timeout, handler));
    }
}

impl TransitionInstance for TriggersInstance {
    fn transform(&mut self, pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        if values.is_empty() {
            warn!(target: "transition.triggers", "empty buffer, transfer abandoned");
            return;
        }

        let input = values.get(0);
        let mut context = Context {
            shared: &self.shared,
            poll_event: &self.transition.poll_event,
            pipeline,
            input,
            last_input: self.last_input,
            output: &mut self.output,
        };
        for action in &self.transition.actions {
            if context.applies(&action.event) {
                for outcome in &action.outcomes {
                    context.invoke(outcome);
                }
            }
        }

        self.last_input = input;
        values.set(0, self.output);
    }
}

impl Transition for TriggersTransition {
    fn accepts_channels(&self, channels: usize) -> bool {
        channels >= 1
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(TriggersInstance {
            transition: self,
            shared: Rc::new(TriggerShared::default()),
            last_input: ChannelValue::OFF,
            output: ChannelValue::OFF,
        })
    }
}
