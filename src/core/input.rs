//! Virtual input device driven by remote agents.
//!
//! # Purpose
//!
//! Holds the instantaneous state of a synthetic controller. The simulation
//! reads it once per tick exactly like a physical gamepad, so movement and
//! camera logic never know whether input came from a human or an agent.
//!
//! # Release semantics
//!
//! - **click** - control goes active and releases itself after a duration
//!   (jump, reload, switch-weapon, inspect)
//! - **press/release** - control stays active until explicitly released
//!   (fire, aim, sprint, crouch)
//! - **axes** - two sticks, clamped to unit magnitude, no timers
//!
//! # Thread safety
//!
//! None. The device lives inside [`crate::core::sim::Simulation`] and is only
//! touched on the simulation thread, via dispatched closures.

use glam::Vec2;
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};

/// Default auto-release time for click controls (seconds)
pub const DEFAULT_CLICK_DURATION: f32 = 0.1;

/// Logical buttons exposed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    Fire,
    Aim,
    Jump,
    Inspect,
    Reload,
    Crouch,
    Sprint,
    SwitchWeapon,
    Slot1,
    Slot2,
    Slot3,
}

impl Control {
    pub const ALL: [Control; 11] = [
        Control::Fire,
        Control::Aim,
        Control::Jump,
        Control::Inspect,
        Control::Reload,
        Control::Crouch,
        Control::Sprint,
        Control::SwitchWeapon,
        Control::Slot1,
        Control::Slot2,
        Control::Slot3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Fire => "fire",
            Control::Aim => "aim",
            Control::Jump => "jump",
            Control::Inspect => "inspect",
            Control::Reload => "reload",
            Control::Crouch => "crouch",
            Control::Sprint => "sprint",
            Control::SwitchWeapon => "switch-weapon",
            Control::Slot1 => "slot1",
            Control::Slot2 => "slot2",
            Control::Slot3 => "slot3",
        }
    }
}

/// Analog axis pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stick {
    /// Movement (x = strafe, y = forward)
    Move,
    /// Camera (x = yaw rate, y = pitch rate)
    Look,
}

/// Auto-release timer. Elapsed time is summed in f64 and compared against
/// the armed duration, so many small ticks never leave a sliver behind.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickTimer {
    duration: f64,
    elapsed: f64,
}

impl ClickTimer {
    fn new(duration: f32) -> Self {
        Self { duration: f64::from(duration.max(0.0)), elapsed: 0.0 }
    }

    /// Deadline reached, allowing for one f32 rounding step per tick length
    fn expired(&self) -> bool {
        let slack = f64::from(f32::EPSILON) * self.duration.max(1.0);
        self.elapsed + slack >= self.duration
    }

    fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0) as f32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ButtonState {
    active: bool,
    /// `None` for press/release controls
    timer: Option<ClickTimer>,
}

/// Synthetic controller state
#[derive(Debug, Clone)]
pub struct VirtualInputDevice {
    buttons: IndexMap<Control, ButtonState>,
    move_axis: Vec2,
    look_axis: Vec2,
    click_duration: f32,
}

impl Default for VirtualInputDevice {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_DURATION)
    }
}

impl VirtualInputDevice {
    /// Create device with every control released.
    ///
    /// `click_duration` is used by the convenience helpers (`jump()`, `reload()` ...).
    pub fn new(click_duration: f32) -> Self {
        let buttons = Control::ALL
            .iter()
            .map(|c| (*c, ButtonState::default()))
            .collect();
        Self {
            buttons,
            move_axis: Vec2::ZERO,
            look_axis: Vec2::ZERO,
            click_duration: click_duration.max(0.0),
        }
    }

    pub fn click_duration(&self) -> f32 {
        self.click_duration
    }

    // === Primitives ===

    /// Activate `control` and arm an auto-release timer.
    ///
    /// A second click before the first expires overwrites the timer.
    pub fn click(&mut self, control: Control, duration: f32) {
        let state = self.state_mut(control);
        state.active = true;
        state.timer = Some(ClickTimer::new(duration));
        trace!("click {} ({:.2}s)", control.as_str(), duration);
    }

    /// Activate `control` until [`release`](Self::release). Clears any pending timer.
    pub fn press(&mut self, control: Control) {
        let state = self.state_mut(control);
        state.active = true;
        state.timer = None;
        trace!("press {}", control.as_str());
    }

    /// Deactivate `control` and clear any pending timer.
    pub fn release(&mut self, control: Control) {
        let state = self.state_mut(control);
        state.active = false;
        state.timer = None;
        trace!("release {}", control.as_str());
    }

    /// Store stick value, scaled down to unit magnitude if longer. Never amplifies.
    pub fn set_axis(&mut self, stick: Stick, x: f32, y: f32) {
        let mut value = Vec2::new(x, y);
        if !value.is_finite() {
            value = Vec2::ZERO;
        }
        let value = value.clamp_length_max(1.0);
        match stick {
            Stick::Move => self.move_axis = value,
            Stick::Look => self.look_axis = value,
        }
        trace!("axis {:?}: ({:.2}, {:.2})", stick, value.x, value.y);
    }

    /// Advance auto-release timers by `dt` seconds.
    ///
    /// Controls whose ticks add up to their click duration are released. `tick(0.0)`
    /// only releases controls armed with a zero duration, so repeated zero ticks are no-ops.
    pub fn tick(&mut self, dt: f32) {
        let dt = f64::from(dt.max(0.0));
        for (control, state) in self.buttons.iter_mut() {
            let Some(timer) = state.timer.as_mut() else {
                continue;
            };
            timer.elapsed += dt;
            if timer.expired() {
                state.active = false;
                state.timer = None;
                trace!("auto-release {}", control.as_str());
            }
        }
    }

    /// Release everything, clear all timers and zero both sticks
    pub fn reset_all(&mut self) {
        for state in self.buttons.values_mut() {
            *state = ButtonState::default();
        }
        self.move_axis = Vec2::ZERO;
        self.look_axis = Vec2::ZERO;
        trace!("reset all input");
    }

    // === Queries ===

    pub fn is_active(&self, control: Control) -> bool {
        self.buttons.get(&control).is_some_and(|s| s.active)
    }

    /// Remaining auto-release time, if armed
    pub fn release_in(&self, control: Control) -> Option<f32> {
        self.buttons.get(&control).and_then(|s| s.timer).map(|t| t.remaining())
    }

    pub fn axis(&self, stick: Stick) -> Vec2 {
        match stick {
            Stick::Move => self.move_axis,
            Stick::Look => self.look_axis,
        }
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            controls: self
                .buttons
                .iter()
                .map(|(control, state)| ControlSnapshot {
                    control: *control,
                    active: state.active,
                    release_in: state.timer.map(|t| t.remaining()),
                })
                .collect(),
            move_axis: [self.move_axis.x, self.move_axis.y],
            look_axis: [self.look_axis.x, self.look_axis.y],
        }
    }

    // === Convenience helpers ===

    pub fn move_stick(&mut self, horizontal: f32, vertical: f32) {
        self.set_axis(Stick::Move, horizontal, vertical);
    }

    pub fn look_stick(&mut self, horizontal: f32, vertical: f32) {
        self.set_axis(Stick::Look, horizontal, vertical);
    }

    pub fn jump(&mut self) {
        self.click(Control::Jump, self.click_duration);
    }

    pub fn reload(&mut self) {
        self.click(Control::Reload, self.click_duration);
    }

    pub fn switch_weapon(&mut self) {
        self.click(Control::SwitchWeapon, self.click_duration);
    }

    pub fn inspect(&mut self) {
        self.click(Control::Inspect, self.click_duration);
    }

    pub fn fire(&mut self, on: bool) {
        self.hold(Control::Fire, on);
    }

    pub fn aim(&mut self, on: bool) {
        self.hold(Control::Aim, on);
    }

    pub fn sprint(&mut self, on: bool) {
        self.hold(Control::Sprint, on);
    }

    /// Crouch is a held control: `true` presses, `false` releases.
    pub fn crouch(&mut self, on: bool) {
        self.hold(Control::Crouch, on);
    }

    fn hold(&mut self, control: Control, on: bool) {
        if on {
            self.press(control);
        } else {
            self.release(control);
        }
    }

    fn state_mut(&mut self, control: Control) -> &mut ButtonState {
        self.buttons.entry(control).or_default()
    }
}

/// Serializable view of one control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlSnapshot {
    pub control: Control,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_in: Option<f32>,
}

/// Serializable view of the whole device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSnapshot {
    pub controls: Vec<ControlSnapshot>,
    pub move_axis: [f32; 2],
    pub look_axis: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_new_device_all_released() {
        let dev = VirtualInputDevice::default();
        for c in Control::ALL {
            assert!(!dev.is_active(c), "{:?}", c);
            assert_eq!(dev.release_in(c), None);
        }
        assert_eq!(dev.axis(Stick::Move), Vec2::ZERO);
        assert_eq!(dev.axis(Stick::Look), Vec2::ZERO);
    }

    #[test]
    fn test_click_releases_after_duration() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Jump, 0.1);
        assert!(dev.is_active(Control::Jump));

        dev.tick(0.04);
        dev.tick(0.04);
        // 0.08 < 0.1: still held
        assert!(dev.is_active(Control::Jump));

        dev.tick(0.04);
        assert!(!dev.is_active(Control::Jump));
        assert_eq!(dev.release_in(Control::Jump), None);
    }

    #[test]
    fn test_click_releases_exactly_at_deadline() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Reload, 0.5);
        dev.tick(0.25);
        assert!(dev.is_active(Control::Reload));
        dev.tick(0.25);
        assert!(!dev.is_active(Control::Reload));
    }

    #[test]
    fn test_click_releases_when_even_ticks_sum_to_duration() {
        for d in [0.05_f32, 0.1, 0.2, 0.25, 0.3, 0.5, 1.0, 2.5] {
            for n in 2..=20 {
                let mut dev = VirtualInputDevice::default();
                dev.click(Control::Jump, d);
                let dt = d / n as f32;
                for i in 1..n {
                    dev.tick(dt);
                    assert!(dev.is_active(Control::Jump), "d={} n={} released after {} ticks", d, n, i);
                }
                dev.tick(dt);
                assert!(
                    !dev.is_active(Control::Jump),
                    "d={} n={} still held, remaining {:?}",
                    d,
                    n,
                    dev.release_in(Control::Jump)
                );
                assert_eq!(dev.release_in(Control::Jump), None);
            }
        }
    }

    #[test]
    fn test_default_click_at_60hz_lasts_six_ticks() {
        let mut dev = VirtualInputDevice::default();
        dev.jump();
        let dt = std::time::Duration::from_secs_f64(1.0 / 60.0).as_secs_f32();
        for _ in 0..5 {
            dev.tick(dt);
        }
        assert!(dev.is_active(Control::Jump));
        dev.tick(dt);
        assert!(!dev.is_active(Control::Jump));
    }

    #[test]
    fn test_zero_duration_click_releases_on_next_tick() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Reload, 0.0);
        assert!(dev.is_active(Control::Reload));
        dev.tick(0.0);
        assert!(!dev.is_active(Control::Reload));
    }

    #[test]
    fn test_click_overwrites_timer() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Inspect, 0.1);
        dev.tick(0.09);
        dev.click(Control::Inspect, 1.0);
        dev.tick(0.5);
        assert!(dev.is_active(Control::Inspect));
        assert!((dev.release_in(Control::Inspect).unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_press_holds_indefinitely() {
        let mut dev = VirtualInputDevice::default();
        dev.press(Control::Fire);
        for _ in 0..10_000 {
            dev.tick(0.016);
        }
        assert!(dev.is_active(Control::Fire));

        dev.release(Control::Fire);
        assert!(!dev.is_active(Control::Fire));
    }

    #[test]
    fn test_press_cancels_pending_click() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Aim, 0.1);
        dev.press(Control::Aim);
        dev.tick(1.0);
        assert!(dev.is_active(Control::Aim));
        assert_eq!(dev.release_in(Control::Aim), None);
    }

    #[test]
    fn test_release_clears_timer() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Jump, 0.1);
        dev.release(Control::Jump);
        assert!(!dev.is_active(Control::Jump));
        assert_eq!(dev.release_in(Control::Jump), None);
    }

    #[test]
    fn test_zero_tick_is_idempotent() {
        let mut dev = VirtualInputDevice::default();
        dev.click(Control::Jump, 0.1);
        for _ in 0..5 {
            dev.tick(0.0);
        }
        assert!(dev.is_active(Control::Jump));
        assert!((dev.release_in(Control::Jump).unwrap() - 0.1).abs() < EPS);
    }

    #[test]
    fn test_set_axis_scales_down_long_vectors() {
        let mut dev = VirtualInputDevice::default();
        dev.set_axis(Stick::Move, 3.0, 4.0);
        let v = dev.axis(Stick::Move);
        assert!((v.length() - 1.0).abs() < EPS);
        assert!((v.x - 0.6).abs() < EPS);
        assert!((v.y - 0.8).abs() < EPS);
    }

    #[test]
    fn test_set_axis_never_amplifies() {
        let mut dev = VirtualInputDevice::default();
        let samples = [(0.0, 0.0), (0.3, -0.2), (-0.7, 0.7), (1.0, 0.0), (-0.1, -0.99)];
        for (x, y) in samples {
            dev.set_axis(Stick::Look, x, y);
            let v = dev.axis(Stick::Look);
            assert!(v.length() <= 1.0 + EPS);
            if Vec2::new(x, y).length() <= 1.0 {
                assert!((v.x - x).abs() < EPS && (v.y - y).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_set_axis_rejects_nan() {
        let mut dev = VirtualInputDevice::default();
        dev.set_axis(Stick::Move, f32::NAN, 0.5);
        assert_eq!(dev.axis(Stick::Move), Vec2::ZERO);
    }

    #[test]
    fn test_axes_unaffected_by_tick() {
        let mut dev = VirtualInputDevice::default();
        dev.move_stick(0.5, 0.5);
        dev.tick(10.0);
        assert_eq!(dev.axis(Stick::Move), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_reset_all() {
        let mut dev = VirtualInputDevice::default();
        dev.press(Control::Sprint);
        dev.click(Control::Jump, 5.0);
        dev.move_stick(1.0, 0.0);
        dev.look_stick(0.0, -1.0);

        dev.reset_all();

        for c in Control::ALL {
            assert!(!dev.is_active(c));
            assert_eq!(dev.release_in(c), None);
        }
        assert_eq!(dev.axis(Stick::Move), Vec2::ZERO);
        assert_eq!(dev.axis(Stick::Look), Vec2::ZERO);
    }

    #[test]
    fn test_crouch_is_held_not_clicked() {
        let mut dev = VirtualInputDevice::default();
        dev.crouch(true);
        dev.tick(1.0);
        // Held past the click duration
        assert!(dev.is_active(Control::Crouch));

        dev.crouch(false);
        assert!(!dev.is_active(Control::Crouch));
    }

    #[test]
    fn test_helpers_use_configured_click_duration() {
        let mut dev = VirtualInputDevice::new(0.25);
        dev.jump();
        dev.reload();
        dev.switch_weapon();
        dev.inspect();
        dev.tick(0.2);
        assert!(dev.is_active(Control::Jump));
        assert!(dev.is_active(Control::SwitchWeapon));
        dev.tick(0.06);
        assert!(!dev.is_active(Control::Jump));
        assert!(!dev.is_active(Control::Reload));
        assert!(!dev.is_active(Control::Inspect));
    }

    #[test]
    fn test_snapshot_lists_every_control() {
        let mut dev = VirtualInputDevice::default();
        dev.fire(true);
        dev.move_stick(0.0, 1.0);
        let snap = dev.snapshot();
        assert_eq!(snap.controls.len(), Control::ALL.len());
        let fire = snap.controls.iter().find(|c| c.control == Control::Fire).unwrap();
        assert!(fire.active);
        assert_eq!(snap.move_axis, [0.0, 1.0]);
    }
}
