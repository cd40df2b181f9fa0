//! Screen brightness from ambient light readings.
//!
//! Lux is mapped on a log scale between [`DARK_LUX`] and [`BRIGHT_LUX`] onto
//! `[MIN_BRIGHTNESS, 1.0]`, then exponentially smoothed so a flickering
//! sensor does not make the screen pulse.

use serde::{Deserialize, Serialize};

pub const DARK_LUX: f64 = 10.0;
pub const BRIGHT_LUX: f64 = 10_000.0;
pub const MIN_BRIGHTNESS: f64 = 0.1;
pub const DEFAULT_ALPHA: f64 = 0.2;

/// Unsmoothed brightness for a lux reading.
pub fn target_brightness(lux: f64) -> f64 {
    if !lux.is_finite() || lux <= DARK_LUX {
        return MIN_BRIGHTNESS;
    }
    if lux >= BRIGHT_LUX {
        return 1.0;
    }
    let span = BRIGHT_LUX.log10() - DARK_LUX.log10();
    let t = (lux.log10() - DARK_LUX.log10()) / span;
    MIN_BRIGHTNESS + (1.0 - MIN_BRIGHTNESS) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrightnessSmoother {
    alpha: f64,
    current: Option<f64>,
}

impl Default for BrightnessSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl BrightnessSmoother {
    /// An `alpha` outside `(0, 1]` is replaced by [`DEFAULT_ALPHA`].
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha > 0.0 && alpha <= 1.0 {
            alpha
        } else {
            DEFAULT_ALPHA
        };
        Self {
            alpha,
            current: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn current(&self) -> Option<f64> {
        self.current
    }

    /// Feed a reading and return the new smoothed brightness.
    /// The first reading is taken as-is.
    pub fn update(&mut self, lux: f64) -> f64 {
        let target = target_brightness(lux);
        let next = match self.current {
            Some(prev) => prev + self.alpha * (target - prev),
            None => target,
        };
        self.current = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn target_is_log_scaled_and_clamped() {
        assert!(close(target_brightness(0.0), MIN_BRIGHTNESS));
        assert!(close(target_brightness(-5.0), MIN_BRIGHTNESS));
        assert!(close(target_brightness(f64::NAN), MIN_BRIGHTNESS));
        assert!(close(target_brightness(100.0), 0.4));
        assert!(close(target_brightness(1_000.0), 0.7));
        assert!(close(target_brightness(50_000.0), 1.0));
    }

    #[test]
    fn smoothing_moves_a_fraction_toward_target() {
        let mut s = BrightnessSmoother::default();
        assert!(close(s.update(10.0), 0.1));
        assert!(close(s.update(10_000.0), 0.1 + 0.2 * 0.9));
        assert!(s.current().unwrap() < 1.0);
    }

    #[test]
    fn bad_alpha_falls_back() {
        assert!(close(BrightnessSmoother::new(0.0).alpha(), DEFAULT_ALPHA));
        assert!(close(BrightnessSmoother::new(1.5).alpha(), DEFAULT_ALPHA));
        assert!(close(BrightnessSmoother::new(1.0).alpha(), 1.0));
    }
}
