//! Graph assembly tests: factory dispatch, dependency resolution, channel
//! count composition, and the fan-in merge, exercised with stub
//! input/output/transition components.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use core_graph::{
    bind_input, Category, Component, ComponentFactory, ComponentMeta, Error, Input,
    InputChangeEvent, Manager, Output, PipelineHandle, Transition, TransitionInstance,
};
use core_properties::Properties;
use core_types::{ChannelBuffer, ChannelValue};

struct StubInput {
    meta: ComponentMeta,
    channels: usize,
    input_change: InputChangeEvent,
}

impl StubInput {
    fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        properties: &core_properties::PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Rc::new(StubInput {
            meta,
            channels: properties.get_or("channels", 1)?,
            input_change: InputChangeEvent::new(),
        }))
    }

    fn fire(&self, values: &[f64]) {
        let buffer: ChannelBuffer = values.iter().map(|&v| ChannelValue::new(v)).collect();
        self.input_change.fire(&buffer);
    }
}

impl Component for StubInput {
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

impl Input for StubInput {
    fn emits_channels(&self) -> usize {
        self.channels
    }

    fn input_change_event(&self) -> &InputChangeEvent {
        &self.input_change
    }
}

struct StubOutput {
    meta: ComponentMeta,
    accepts: Option<usize>,
    received: RefCell<Vec<Vec<f64>>>,
}

impl StubOutput {
    fn create(
        manager: &mut Manager,
        meta: ComponentMeta,
        properties: &core_properties::PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        let accepts = if properties.has("accepts") {
            Some(properties.get("accepts")?)
        } else {
            None
        };
        let output = Rc::new(StubOutput {
            meta,
            accepts,
            received: RefCell::new(Vec::new()),
        });
        if properties.has("input") {
            let as_output: Rc<dyn Output> = output.clone();
            bind_input(manager, &as_output, &properties.child("input")?)?;
        }
        Ok(output)
    }

    fn received(&self) -> Vec<Vec<f64>> {
        self.received.borrow().clone()
    }
}

impl Component for StubOutput {
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

impl Output for StubOutput {
    fn accepts_channels(&self, channels: usize) -> bool {
        self.accepts.map_or(true, |accepted| accepted == channels)
    }

    fn set(&self, _source: &ComponentMeta, values: &ChannelBuffer) {
        self.received
            .borrow_mut()
            .push(values.iter().map(ChannelValue::get).collect());
    }
}

/// Doubles the channel count by appending a zero per incoming channel.
struct WidenTransition {
    meta: ComponentMeta,
}

impl WidenTransition {
    fn create(
        _manager: &mut Manager,
        meta: ComponentMeta,
        _properties: &core_properties::PropertyNode<'_>,
    ) -> Result<Rc<dyn Component>, Error> {
        Ok(Rc::new(WidenTransition { meta }))
    }
}

impl Component for WidenTransition {
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

struct WidenInstance;

impl TransitionInstance for WidenInstance {
    fn transform(&mut self, _pipeline: &PipelineHandle, values: &mut ChannelBuffer) {
        values.resize(values.len() * 2);
    }
}

impl Transition for WidenTransition {
    fn accepts_channels(&self, _channels: usize) -> bool {
        true
    }

    fn emits_channels(&self, channels: usize) -> usize {
        channels * 2
    }

    fn instantiate(self: Rc<Self>) -> Box<dyn TransitionInstance> {
        Box::new(WidenInstance)
    }
}

fn factory() -> ComponentFactory {
    let mut factory = ComponentFactory::new();
    core_graph::register(&mut factory).unwrap();
    factory
        .register(Category::Input, "stub", StubInput::create)
        .unwrap();
    factory
        .register(Category::Output, "stub", StubOutput::create)
        .unwrap();
    factory
        .register(Category::Transition, "widen", WidenTransition::create)
        .unwrap();
    factory
}

fn manager(config: serde_json::Value) -> Result<Manager, Error> {
    let properties = Properties::from_value(config);
    Manager::new(factory(), &properties)
}

fn stub_input(manager: &Manager, id: &str) -> Rc<StubInput> {
    manager
        .find(id)
        .expect("component exists")
        .as_any()
        .downcast()
        .expect("is a stub input")
}

fn stub_output(manager: &Manager, id: &str) -> Rc<StubOutput> {
    manager
        .find(id)
        .expect("component exists")
        .as_any()
        .downcast()
        .expect("is a stub output")
}

#[test]
fn builds_components_from_configuration() {
    let manager = manager(json!({
        "updateInterval": 40,
        "components": [
            {"type": "input:stub", "id": "button", "channels": 1},
            {"type": "output:stub", "id": "lamp", "input": "button"},
        ]
    }))
    .unwrap();
    assert!(manager.find("button").is_some());
    assert!(manager.find("lamp").is_some());
    assert_eq!(manager.update_interval(), std::time::Duration::from_millis(40));
}

#[test]
fn update_interval_accepts_duration_strings() {
    let manager = manager(json!({
        "updateInterval": "25ms",
        "components": []
    }))
    .unwrap();
    assert_eq!(manager.update_interval(), std::time::Duration::from_millis(25));
}

#[test]
fn outputs_receive_buffers_after_ready() {
    let manager = manager(json!({
        "components": [
            {"type": "input:stub", "id": "button"},
            {"type": "output:stub", "id": "lamp", "input": "button"},
        ]
    }))
    .unwrap();
    manager.ready_event().fire(&());
    assert!(manager.startup_errors().take_first().is_none());

    stub_input(&manager, "button").fire(&[100.0]);
    assert_eq!(stub_output(&manager, "lamp").received(), vec![vec![100.0]]);
}

#[test]
fn channel_count_mismatch_is_reported_at_ready() {
    let manager = manager(json!({
        "components": [
            {"type": "input:stub", "id": "button", "channels": 1},
            {"type": "output:stub", "id": "lamp", "accepts": 3, "input": "button"},
        ]
    }))
    .unwrap();
    manager.ready_event().fire(&());
    assert!(matches!(
        manager.startup_errors().take_first(),
        Some(Error::ChannelCountMismatch { channels: 1, .. })
    ));
}

#[test]
fn inline_definitions_create_anonymous_components() {
    let manager = manager(json!({
        "components": [
            {"type": "output:stub", "id": "lamp", "input": {"type": "input:stub", "channels": 2}},
        ]
    }))
    .unwrap();
    // The inline input was registered under a generated id.
    assert!(manager.find("input:stub.924536").is_some());
}

#[test]
fn unknown_dependencies_fail_construction() {
    let error = manager(json!({
        "components": [
            {"type": "output:stub", "id": "lamp", "input": "nosuch"},
        ]
    }))
    .unwrap_err();
    assert!(matches!(
        error,
        Error::UnknownDependency { ref requester, ref id } if requester == "lamp" && id == "nosuch"
    ));
}

#[test]
fn wrong_dependency_capability_fails_construction() {
    let error = manager(json!({
        "components": [
            {"type": "output:stub", "id": "sink"},
            {"type": "output:stub", "id": "lamp", "input": "sink"},
        ]
    }))
    .unwrap_err();
    assert!(matches!(error, Error::WrongDependencyType { expected: "input", .. }));
}

#[test]
fn duplicate_ids_fail_construction() {
    let error = manager(json!({
        "components": [
            {"type": "input:stub", "id": "twin"},
            {"type": "input:stub", "id": "twin"},
        ]
    }))
    .unwrap_err();
    assert!(matches!(error, Error::DuplicateId { ref id } if id == "twin"));
}

#[test]
fn connection_checks_channel_composition_at_construction() {
    // widen emits 2, output insists on 3.
    let error = manager(json!({
        "components": [
            {"type": "input:stub", "id": "button", "channels": 1},
            {"type": "output:stub", "id": "lamp", "accepts": 3},
            {
                "type": "connection",
                "id": "flow",
                "input": "button",
                "transitions": [{"type": "transition:widen"}],
                "output": "lamp"
            },
        ]
    }))
    .unwrap_err();
    assert!(matches!(
        error,
        Error::ChannelCountMismatch { channels: 2, .. }
    ));
}

#[test]
fn connection_transfers_through_the_chain() {
    let manager = manager(json!({
        "components": [
            {"type": "input:stub", "id": "button", "channels": 1},
            {"type": "output:stub", "id": "lamp", "accepts": 2},
            {
                "type": "connection",
                "id": "flow",
                "input": "button",
                "transitions": [{"type": "transition:widen"}],
                "output": "lamp"
            },
        ]
    }))
    .unwrap();
    manager.ready_event().fire(&());

    stub_input(&manager, "button").fire(&[70.0]);
    assert_eq!(stub_output(&manager, "lamp").received(), vec![vec![70.0, 0.0]]);
}

#[test]
fn multiconnection_emits_the_elementwise_maximum() {
    let manager = manager(json!({
        "components": [
            {"type": "input:stub", "id": "a", "channels": 2},
            {"type": "input:stub", "id": "b", "channels": 2},
            {"type": "multiconnection", "id": "both", "inputs": ["a", "b"]},
            {"type": "output:stub", "id": "lamp", "input": "both"},
        ]
    }))
    .unwrap();
    manager.ready_event().fire(&());
    assert!(manager.startup_errors().take_first().is_none());

    stub_input(&manager, "a").fire(&[20.0, 80.0]);
    stub_input(&manager, "b").fire(&[60.0, 10.0]);
    let received = stub_output(&manager, "lamp").received();
    assert_eq!(received.last().unwrap(), &vec![60.0, 80.0]);
}

#[test]
fn multiconnection_pads_shorter_buffers_with_zero() {
    let manager = manager(json!({
        "components": [
            {"type": "input:stub", "id": "wide", "channels": 3},
            {"type": "input:stub", "id": "narrow", "channels": 1},
            {"type": "multiconnection", "id": "both", "inputs": ["wide", "narrow"]},
            {"type": "output:stub", "id": "lamp", "input": "both"},
        ]
    }))
    .unwrap();
    manager.ready_event().fire(&());

    stub_input(&manager, "wide").fire(&[5.0, 6.0, 7.0]);
    stub_input(&manager, "narrow").fire(&[90.0]);
    let received = stub_output(&manager, "lamp").received();
    assert_eq!(received.last().unwrap(), &vec![90.0, 6.0, 7.0]);
}
