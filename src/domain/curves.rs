//! Response curves for pointer and wheel shaping. Pure functions, no state.

/// Steepness of the logistic acceleration ramp
pub const CURVE_SHARPNESS: f64 = 10.0;
/// Speed (counts per ms) at which acceleration reaches half its extra gain
pub const CURVE_MID: f64 = 0.08;

/// Wheel deltas below this magnitude get boosted
pub const SCROLL_BOOST_THRESHOLD: f64 = 10.0;
pub const DEFAULT_SCROLL_BOOST: f64 = 1.4;

/// Reference frame length the scroll decay ratio is expressed against
pub const DECAY_FRAME_MS: f64 = 16.0;

/// Logistic pointer acceleration in (1, 2).
///
/// Never drops below 1 so slow motion is not suppressed, and flattens out
/// near 2 so fast flicks don't run away.
pub fn acceleration_curve(speed: f64) -> f64 {
    1.0 + 1.0 / (1.0 + (-CURVE_SHARPNESS * (speed - CURVE_MID)).exp())
}

/// Boost small wheel deltas so short flicks still register.
///
/// Returns a magnitude; the caller takes direction from the delta itself.
pub fn scroll_curve(delta: f64, boost: f64) -> f64 {
    let magnitude = delta.abs();
    if magnitude < SCROLL_BOOST_THRESHOLD {
        magnitude * boost
    } else {
        magnitude
    }
}

/// Multiplier applied to the scroll remainder after `elapsed_ms` of idle,
/// given a per-frame decay ratio.
pub fn decay_ratio(decay: f64, elapsed_ms: f64) -> f64 {
    decay.powf(elapsed_ms / DECAY_FRAME_MS)
}
