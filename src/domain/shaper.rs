use crate::domain::curves::{acceleration_curve, decay_ratio, scroll_curve};
use crate::domain::models::{Command, DeltaMode, MouseButton, ScrollDirection};
use crate::domain::settings::ShapingSettings;
use tracing::{debug, trace};

/// Weight kept from the previous smoothed value on each pointer event
pub const SMOOTHING: f64 = 0.65;
/// Smoothed per-axis velocity below this is treated as zero
pub const DEADZONE: f64 = 0.15;
/// Relay accepts signed 8-bit deltas, minus the asymmetric -128
pub const MAX_DELTA: f64 = 127.0;

pub const SCROLL_SCALE: f64 = 0.02;
pub const MAX_SCROLL_STEPS: u32 = 6;
/// Idle time after the last wheel event before the remainder starts decaying
pub const DECAY_IDLE_MS: f64 = 40.0;
pub const REMAINDER_SNAP: f64 = 0.01;
/// Ceiling on banked scroll travel; a single huge delta cannot queue more
/// than a few bursts of steps
pub const MAX_REMAINDER: f64 = (MAX_SCROLL_STEPS * 4) as f64;

/// Per-session mutable shaping state. Timestamps are milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaperState {
    pub smooth_x: f64,
    pub smooth_y: f64,
    pub last_move_ms: f64,
    pub scroll_remainder: f64,
    pub last_scroll_ms: f64,
}

/// Turns raw pointer, wheel and button input into relay commands
pub struct InputShaper {
    state: ShaperState,
    settings: ShapingSettings,
}

impl InputShaper {
    pub fn new(settings: ShapingSettings) -> Self {
        Self {
            state: ShaperState::default(),
            settings: settings.sanitized(),
        }
    }

    pub fn state(&self) -> &ShaperState {
        &self.state
    }

    pub fn set_settings(&mut self, settings: ShapingSettings) {
        self.settings = settings.sanitized();
    }

    /// Smooth, deadzone and accelerate a relative pointer movement.
    ///
    /// Returns `None` when both axes round to zero; nothing should be sent.
    pub fn on_pointer_delta(&mut self, dx: f64, dy: f64, now_ms: f64) -> Option<Command> {
        let dt = (now_ms - self.state.last_move_ms).max(1.0);
        self.state.last_move_ms = now_ms;

        let speed = (dx * dx + dy * dy).sqrt() / dt;

        self.state.smooth_x = self.state.smooth_x * SMOOTHING + dx * (1.0 - SMOOTHING);
        self.state.smooth_y = self.state.smooth_y * SMOOTHING + dy * (1.0 - SMOOTHING);

        if self.state.smooth_x.abs() < DEADZONE {
            self.state.smooth_x = 0.0;
        }
        if self.state.smooth_y.abs() < DEADZONE {
            self.state.smooth_y = 0.0;
        }

        let gain = acceleration_curve(speed) * self.settings.mouse_sensitivity;
        let out_x = to_delta(self.state.smooth_x * gain);
        let out_y = to_delta(self.state.smooth_y * gain);

        if out_x == 0 && out_y == 0 {
            return None;
        }

        trace!(speed, out_x, out_y, "pointer shaped");
        Some(Command::MouseMove {
            dx: out_x,
            dy: out_y,
        })
    }

    /// Accumulate a wheel delta and emit one Scroll per whole step.
    ///
    /// The remainder only holds magnitude, so a reversal keeps the
    /// accumulated travel and spends it in the new direction.
    pub fn on_wheel(&mut self, raw_delta: f64, mode: DeltaMode, now_ms: f64) -> Vec<Command> {
        let delta = raw_delta * mode.multiplier();
        let travel = scroll_curve(delta, self.settings.scroll_boost) * SCROLL_SCALE;
        if !travel.is_finite() {
            debug!("Ignoring non-finite wheel delta {}", raw_delta);
            return Vec::new();
        }

        self.state.last_scroll_ms = now_ms;
        self.state.scroll_remainder = (self.state.scroll_remainder + travel).min(MAX_REMAINDER);

        let steps = (self.state.scroll_remainder.floor() as u32).min(MAX_SCROLL_STEPS);
        if steps == 0 {
            return Vec::new();
        }

        // Natural scrolling: positive delta (content moving up) scrolls down
        let direction = if delta > 0.0 {
            ScrollDirection::Down
        } else {
            ScrollDirection::Up
        };

        self.state.scroll_remainder -= steps as f64;

        trace!(
            steps,
            remainder = self.state.scroll_remainder,
            "wheel shaped"
        );
        vec![Command::Scroll { direction }; steps as usize]
    }

    /// Coast the scroll remainder down while the wheel is idle.
    ///
    /// Meant to be driven by a steady ~60 Hz clock. The exponent grows with
    /// the total idle time, so every tick decays harder than the last.
    pub fn decay_tick(&mut self, now_ms: f64) {
        if !self.state.scroll_remainder.is_finite() {
            self.state.scroll_remainder = 0.0;
            return;
        }
        let elapsed = now_ms - self.state.last_scroll_ms;
        if elapsed > DECAY_IDLE_MS && self.state.scroll_remainder != 0.0 {
            self.state.scroll_remainder *= decay_ratio(self.settings.scroll_decay, elapsed);
            if self.state.scroll_remainder < REMAINDER_SNAP {
                self.state.scroll_remainder = 0.0;
            }
        }
    }

    pub fn on_button(&self, host_index: u8, pressed: bool) -> Option<Command> {
        MouseButton::from_host_index(host_index)
            .map(|button| Command::MouseButton { button, pressed })
    }
}

/// Round half up and clamp to the protocol range
fn to_delta(value: f64) -> i8 {
    (value + 0.5).floor().clamp(-MAX_DELTA, MAX_DELTA) as i8
}
