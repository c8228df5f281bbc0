//! Keyboard state sampled once per frame, plus the adjusters that turn key
//! presses into parameter changes.

use std::collections::HashSet;

use svbrdf_core::constants::CTRL_MULTIPLIER;
use svbrdf_core::Cycle;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Keys held down, and keys that went down since the last frame.
#[derive(Debug, Default)]
pub struct Controls {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key event. OS key repeat does not count as a new press.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(key) {
                    self.pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// Forget per-frame presses. Called after the frame consumed them.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }

    /// Drop everything, e.g. when the window loses focus.
    pub fn reset(&mut self) {
        self.held.clear();
        self.pressed.clear();
    }

    pub fn held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn ctrl(&self) -> bool {
        self.held(KeyCode::ControlLeft) || self.held(KeyCode::ControlRight)
    }

    /// An increment or multiplier, scaled up while Ctrl is held.
    pub fn increment(&self, amount: f32) -> f32 {
        if self.ctrl() {
            amount * CTRL_MULTIPLIER
        } else {
            amount
        }
    }

    /// Add or subtract `step` while the keys are held, then clamp.
    pub fn adjust_clamped(
        &self,
        increase: KeyCode,
        decrease: KeyCode,
        value: &mut f32,
        step: f32,
        min: f32,
        max: f32,
    ) -> bool {
        let mut changed = false;
        if self.held(increase) {
            *value += self.increment(step);
            changed = true;
        }
        if self.held(decrease) {
            *value -= self.increment(step);
            changed = true;
        }
        *value = value.clamp(min, max);
        changed
    }

    /// Multiply or divide by `factor` while held (or once per press), then clamp.
    #[allow(clippy::too_many_arguments)]
    pub fn adjust_multiplied(
        &self,
        increase: KeyCode,
        decrease: KeyCode,
        value: &mut f32,
        factor: f32,
        min: f32,
        max: f32,
        on_press: bool,
    ) -> bool {
        let active = |key| {
            if on_press {
                self.pressed(key)
            } else {
                self.held(key)
            }
        };
        let mut changed = false;
        if active(increase) {
            *value *= self.increment(factor);
            changed = true;
        }
        if active(decrease) {
            *value /= self.increment(factor);
            changed = true;
        }
        *value = value.clamp(min, max);
        changed
    }

    /// Step an integer once per press, clamped to `[min, max]`.
    pub fn step_clamped(
        &self,
        increase: KeyCode,
        decrease: KeyCode,
        value: &mut i32,
        min: i32,
        max: i32,
    ) -> bool {
        let mut changed = false;
        if self.pressed(increase) {
            *value += 1;
            changed = true;
        }
        if self.pressed(decrease) {
            *value -= 1;
            changed = true;
        }
        *value = (*value).clamp(min, max.max(min));
        changed
    }

    /// -1, 0 or +1 from a pair of keys, once per press.
    pub fn step(&self, increase: KeyCode, decrease: KeyCode) -> i32 {
        i32::from(self.pressed(increase)) - i32::from(self.pressed(decrease))
    }

    /// Advance a mode to its next variant on press and log the new value.
    pub fn cycle<T: Cycle + std::fmt::Debug>(&self, name: &str, key: KeyCode, value: &mut T) -> bool {
        if !self.pressed(key) {
            return false;
        }
        *value = value.next();
        log::info!("{name}: {value:?}");
        true
    }

    pub fn toggle(&self, name: &str, key: KeyCode, value: &mut bool) -> bool {
        if !self.pressed(key) {
            return false;
        }
        *value = !*value;
        log::info!("{name}: {value}");
        true
    }
}
