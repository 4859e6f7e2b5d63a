//! Scenario tests for the transition state machines, driven through a
//! miniature pipeline harness with a hand-cranked poll event.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use core_graph::{
    Category, ComponentMeta, PipelineHandle, PollEvent, Retransfer, Transition,
    TransitionInstance,
};
use core_transitions::{
    AnimateTransition, FadeTransition, FillColorTransition, GradientColorTransition,
    MultiplyTransition, ShiftTransition, TriggersTransition, WavesAnimator,
};
use core_types::{ChannelBuffer, ChannelValue, Rgb};

fn meta(name: &'static str) -> ComponentMeta {
    ComponentMeta::new(Category::Transition, name, format!("{name}.test"))
}

fn buffer(values: &[f64]) -> ChannelBuffer {
    values.iter().map(|&v| ChannelValue::new(v)).collect()
}

/// Stand-in for a connection: caches the last input and replays it through
/// the chain on retransfer, recording every emitted buffer.
struct Rig {
    instances: RefCell<Vec<Box<dyn TransitionInstance>>>,
    last_input: RefCell<ChannelBuffer>,
    outputs: RefCell<Vec<Vec<f64>>>,
}

impl Rig {
    fn new(transitions: Vec<Rc<dyn Transition>>) -> Rc<Rig> {
        Rc::new(Rig {
            instances: RefCell::new(
                transitions
                    .into_iter()
                    .map(|transition| transition.instantiate())
                    .collect(),
            ),
            last_input: RefCell::new(ChannelBuffer::new()),
            outputs: RefCell::new(Vec::new()),
        })
    }

    fn send(self: &Rc<Self>, values: &[f64]) {
        *self.last_input.borrow_mut() = buffer(values);
        Rc::clone(self).retransfer();
    }

    fn last_output(&self) -> Vec<f64> {
        self.outputs.borrow().last().cloned().expect("an output was emitted")
    }
}

impl Retransfer for Rig {
    fn retransfer(self: Rc<Self>) {
        let mut values = self.last_input.borrow().clone();
        let handle = PipelineHandle::of(&self);
        for instance in self.instances.borrow_mut().iter_mut() {
            instance.transform(&handle, &mut values);
        }
        self.outputs
            .borrow_mut()
            .push(values.iter().map(ChannelValue::get).collect());
    }
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
    }
}

// --- fade ----------------------------------------------------------------

#[test]
fn fade_interpolates_toward_the_target_over_ticks() {
    let poll = PollEvent::new();
    let fade = FadeTransition::with_speed(meta("fade"), poll.clone(), Duration::from_millis(1000));
    let rig = Rig::new(vec![fade as Rc<dyn Transition>]);

    rig.send(&[100.0]);
    assert_close(&rig.last_output(), &[0.0]);
    assert_eq!(poll.handler_count(), 1, "tick subscription active");

    poll.fire(&Duration::from_millis(500));
    assert_close(&rig.last_output(), &[50.0]);
    assert_eq!(poll.handler_count(), 1);

    poll.fire(&Duration::from_millis(500));
    assert_close(&rig.last_output(), &[100.0]);
    assert_eq!(poll.handler_count(), 1, "released only on the next entry");

    poll.fire(&Duration::from_millis(500));
    assert_close(&rig.last_output(), &[100.0]);
    assert_eq!(poll.handler_count(), 0, "settled fade released its tick subscription");
}

#[test]
fn fade_clamps_overshoot_at_the_target() {
    let poll = PollEvent::new();
    let fade = FadeTransition::with_speed(meta("fade"), poll.clone(), Duration::from_millis(100));
    let rig = Rig::new(vec![fade as Rc<dyn Transition>]);

    rig.send(&[60.0]);
    // One long tick: factor 3.0 would overshoot 60 by far.
    poll.fire(&Duration::from_millis(300));
    assert_close(&rig.last_output(), &[60.0]);
}

#[test]
fn fade_retargets_mid_flight() {
    let poll = PollEvent::new();
    let fade = FadeTransition::with_speed(meta("fade"), poll.clone(), Duration::from_millis(1000));
    let rig = Rig::new(vec![fade as Rc<dyn Transition>]);

    rig.send(&[100.0]);
    poll.fire(&Duration::from_millis(500)); // at 50
    // New target: deltas recompute from 50 and the entry advances with the
    // factor retained from the last tick.
    rig.send(&[0.0]);
    assert_close(&rig.last_output(), &[25.0]);
    poll.fire(&Duration::from_millis(500));
    assert_close(&rig.last_output(), &[0.0]);
}

// --- shift / multiply ----------------------------------------------------

#[test]
fn shift_then_multiply_expands_the_pattern() {
    let shift = ShiftTransition::with_offset(meta("shift"), 2);
    let multiply = MultiplyTransition::with_factor(meta("multiply"), 3);
    assert_eq!(shift.emits_channels(1), 3);
    assert_eq!(multiply.emits_channels(3), 9);

    let rig = Rig::new(vec![shift as Rc<dyn Transition>, multiply]);
    rig.send(&[100.0]);
    assert_close(
        &rig.last_output(),
        &[0.0, 0.0, 100.0, 0.0, 0.0, 100.0, 0.0, 0.0, 100.0],
    );
}

// --- color ---------------------------------------------------------------

fn to_bytes(channels: &[f64]) -> Vec<u8> {
    channels
        .iter()
        .map(|&value| (value * 255.0 / 100.0).round() as u8)
        .collect()
}

#[test]
fn fill_scales_the_color_by_each_channel() {
    let fill = FillColorTransition::with_color(meta("color:fill"), Rgb::new(0xff, 0x00, 0x80));
    let rig = Rig::new(vec![fill as Rc<dyn Transition>]);
    rig.send(&[100.0, 0.0]);
    let bytes = to_bytes(&rig.last_output());
    assert_eq!(bytes, vec![0xff, 0x00, 0x80, 0x00, 0x00, 0x00]);
}

#[test]
fn gradient_blends_between_the_endpoint_colors() {
    let gradient = GradientColorTransition::with_colors(
        meta("color:gradient"),
        Rgb::new(0xff, 0x00, 0x00),
        Rgb::new(0x00, 0x00, 0xff),
    );
    let rig = Rig::new(vec![gradient as Rc<dyn Transition>]);
    rig.send(&[100.0, 100.0, 100.0]);
    let bytes = to_bytes(&rig.last_output());
    assert_eq!(bytes.len(), 9);
    assert_eq!(&bytes[0..3], &[0xff, 0x00, 0x00]);
    assert_eq!(&bytes[6..9], &[0x00, 0x00, 0xff]);
    // Middle pixel within ±1 of 7f007f.
    assert!((bytes[3] as i32 - 0x7f).abs() <= 1, "{bytes:?}");
    assert_eq!(bytes[4], 0);
    assert!((bytes[5] as i32 - 0x7f).abs() <= 1, "{bytes:?}");
}

#[test]
fn gradient_with_a_single_pixel_uses_the_start_color() {
    let gradient = GradientColorTransition::with_colors(
        meta("color:gradient"),
        Rgb::new(0x10, 0x20, 0x30),
        Rgb::new(0xff, 0xff, 0xff),
    );
    let rig = Rig::new(vec![gradient as Rc<dyn Transition>]);
    rig.send(&[100.0]);
    assert_eq!(to_bytes(&rig.last_output()), vec![0x10, 0x20, 0x30]);
}

// --- triggers ------------------------------------------------------------

#[test]
fn triggers_set_and_timeout_round_trip() {
    let poll = PollEvent::new();
    let triggers = TriggersTransition::from_expressions(
        meta("triggers"),
        poll.clone(),
        &[
            ("change(on)", ["set(fullOn)", "startTimer(1, 500ms)"].as_slice()),
            ("timeout(1)", ["set(off)"].as_slice()),
        ],
    )
    .unwrap();
    let rig = Rig::new(vec![triggers as Rc<dyn Transition>]);

    rig.send(&[0.0]);
    assert_close(&rig.last_output(), &[0.0]);

    rig.send(&[100.0]);
    assert_close(&rig.last_output(), &[100.0]);

    poll.fire(&Duration::from_millis(250));
    assert_close(&rig.last_output(), &[100.0]);

    // Timer expires; the retransfer replays the cached input and the
    // timeout action switches the output off.
    poll.fire(&Duration::from_millis(250));
    assert_close(&rig.last_output(), &[0.0]);
}

#[test]
fn triggers_change_fires_only_on_the_matching_edge() {
    let poll = PollEvent::new();
    let triggers = TriggersTransition::from_expressions(
        meta("triggers"),
        poll,
        &[("change(on)", ["set(fullOn)"].as_slice())],
    )
    .unwrap();
    let rig = Rig::new(vec![triggers as Rc<dyn Transition>]);

    rig.send(&[40.0]);
    assert_close(&rig.last_output(), &[100.0]);
    // Still on: no edge, output keeps its previous value.
    rig.send(&[70.0]);
    assert_close(&rig.last_output(), &[100.0]);
    rig.send(&[0.0]);
    assert_close(&rig.last_output(), &[100.0]);
    // Off→on again is a fresh edge.
    rig.send(&[10.0]);
    assert_close(&rig.last_output(), &[100.0]);
}

#[test]
fn stop_timer_cancels_a_pending_timeout() {
    let poll = PollEvent::new();
    let triggers = TriggersTransition::from_expressions(
        meta("triggers"),
        poll.clone(),
        &[
            ("change(on)", ["set(fullOn)", "startTimer(1, 200ms)"].as_slice()),
            ("change(off)", ["stopTimer(1)"].as_slice()),
            ("timeout(1)", ["set(off)"].as_slice()),
        ],
    )
    .unwrap();
    let rig = Rig::new(vec![triggers as Rc<dyn Transition>]);

    rig.send(&[100.0]);
    rig.send(&[0.0]); // cancels the timer, output still fullOn
    poll.fire(&Duration::from_millis(400));
    assert_close(&rig.last_output(), &[100.0]);
}

#[test]
fn restarting_a_timer_replaces_the_pending_one() {
    let poll = PollEvent::new();
    let triggers = TriggersTransition::from_expressions(
        meta("triggers"),
        poll.clone(),
        &[
            ("change(fullOn)", ["startTimer(7, 300ms)"].as_slice()),
            ("timeout(7)", ["set(fullOn)"].as_slice()),
        ],
    )
    .unwrap();
    let rig = Rig::new(vec![triggers as Rc<dyn Transition>]);

    rig.send(&[100.0]);
    poll.fire(&Duration::from_millis(200));
    // Re-arm before expiry: edge needs a dip below fullOn first.
    rig.send(&[50.0]);
    rig.send(&[100.0]);
    poll.fire(&Duration::from_millis(200));
    assert_close(&rig.last_output(), &[0.0]);
    poll.fire(&Duration::from_millis(100));
    assert_close(&rig.last_output(), &[100.0]);
}

#[test]
fn trigger_values_accept_exact_percents() {
    let poll = PollEvent::new();
    let triggers = TriggersTransition::from_expressions(
        meta("triggers"),
        poll,
        &[("change(50)", ["set(100)"].as_slice())],
    )
    .unwrap();
    let rig = Rig::new(vec![triggers as Rc<dyn Transition>]);
    rig.send(&[49.0]);
    assert_close(&rig.last_output(), &[0.0]);
    rig.send(&[50.0]);
    assert_close(&rig.last_output(), &[100.0]);
}

// --- animate -------------------------------------------------------------

#[test]
fn animate_goes_dark_and_releases_ticks_when_input_is_off() {
    let poll = PollEvent::new();
    let waves = AnimateTransition::new(
        meta("animate:waves"),
        poll.clone(),
        WavesAnimator::new(1.0, 0.1, 1.0, 0.1, 0.2, 1.0),
    );
    let rig = Rig::new(vec![waves as Rc<dyn Transition>]);

    rig.send(&[100.0, 100.0, 100.0]);
    assert_eq!(poll.handler_count(), 1, "animator polls while lit");

    poll.fire(&Duration::from_millis(40));
    assert_eq!(rig.last_output().len(), 3);

    rig.send(&[0.0, 0.0, 0.0]);
    assert_close(&rig.last_output(), &[0.0, 0.0, 0.0]);
    assert_eq!(poll.handler_count(), 0, "animator released its tick subscription");
}

#[test]
fn animate_emits_one_pixel_per_input_triple() {
    let poll = PollEvent::new();
    let waves = AnimateTransition::new(
        meta("animate:waves"),
        poll.clone(),
        WavesAnimator::new(1.0, 0.5, 1.0, 0.5, 1.0, 1.0),
    );
    assert!(waves.accepts_channels(6));
    assert!(!waves.accepts_channels(4));
    let rig = Rig::new(vec![waves as Rc<dyn Transition>]);

    rig.send(&[100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    poll.fire(&Duration::from_millis(40));
    let output = rig.last_output();
    assert_eq!(output.len(), 6);
    // Constant full brightness: some channel of the wheel color is lit.
    assert!(output.iter().any(|&value| value > 0.0));
}
