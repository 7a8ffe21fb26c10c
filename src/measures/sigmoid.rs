//! Sigmoid calibration from native measure scores to quality scalars.
//!
//! Every measure registers one named mapping per result key:
//! `scalar = clamp(round?(h · (a + s · σ(raw))), 0, 100)` with
//! `σ(raw) = 1 / (1 + exp((x0 − raw) / w))`. Defaults are measure-specific
//! and individually overridable from configuration under
//! `measures_params.<Key>.sigmoid.{h,a,s,x0,w,round}`.

use crate::config::Settings;
use crate::types::MeasureId;

/// Parameters of one native→scalar mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidParameters {
    /// Output gain.
    pub h: f64,
    /// Output offset (in units of `h`).
    pub a: f64,
    /// Sigmoid sign/weight; −1 with `a = 1` inverts the mapping.
    pub s: f64,
    /// Sigmoid center in raw-score units.
    pub x0: f64,
    /// Sigmoid width in raw-score units.
    pub w: f64,
    /// Whether to round the scalar to the nearest integer.
    pub round: bool,
}

impl Default for SigmoidParameters {
    fn default() -> Self {
        Self {
            h: 100.0,
            a: 0.0,
            s: 1.0,
            x0: 0.0,
            w: 1.0,
            round: true,
        }
    }
}

impl SigmoidParameters {
    /// Standard increasing mapping centered at `x0` with width `w`.
    pub fn new(x0: f64, w: f64) -> Self {
        Self {
            x0,
            w,
            ..Self::default()
        }
    }

    /// Invert the mapping (`a = 1`, `s = −1`): high raw scores map to low
    /// scalars. Used by measures where a large native score means poor
    /// quality (for example mean gradient over the background).
    pub fn set_inverse(mut self) -> Self {
        self.a = 1.0;
        self.s = -1.0;
        self
    }

    /// Apply configuration overrides for one result key.
    pub fn load_overrides(mut self, settings: &Settings, key: MeasureId) -> Self {
        let prefix = format!("measures_params.{}.sigmoid", key.as_str());
        self.h = settings.get_f64_or(&format!("{prefix}.h"), self.h);
        self.a = settings.get_f64_or(&format!("{prefix}.a"), self.a);
        self.s = settings.get_f64_or(&format!("{prefix}.s"), self.s);
        self.x0 = settings.get_f64_or(&format!("{prefix}.x0"), self.x0);
        self.w = settings.get_f64_or(&format!("{prefix}.w"), self.w);
        self.round = settings.get_bool_or(&format!("{prefix}.round"), self.round);
        self
    }

    /// Map a native score to a quality scalar in [0, 100].
    pub fn map(&self, raw: f64) -> f64 {
        let sig = 1.0 / (1.0 + ((self.x0 - raw) / self.w).exp());
        let mut value = self.h * (self.a + self.s * sig);
        if self.round {
            value = value.round();
        }
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_monotone_increasing() {
        let p = SigmoidParameters::new(5.0, 2.0);
        let mut last = -1.0;
        for i in 0..50 {
            let v = p.map(i as f64 * 0.5);
            assert!(v >= last, "not monotone at raw {}", i as f64 * 0.5);
            last = v;
        }
    }

    #[test]
    fn inverse_mapping_is_monotone_decreasing() {
        let p = SigmoidParameters::new(5.0, 2.0).set_inverse();
        let mut last = 101.0;
        for i in 0..50 {
            let v = p.map(i as f64 * 0.5);
            assert!(v <= last, "not decreasing at raw {}", i as f64 * 0.5);
            last = v;
        }
    }

    #[test]
    fn center_maps_to_half_gain() {
        let p = SigmoidParameters::new(10.0, 1.0);
        assert_eq!(p.map(10.0), 50.0); // σ(x0) = 0.5
    }

    #[test]
    fn output_is_clamped_to_0_100() {
        let p = SigmoidParameters {
            h: 500.0,
            ..SigmoidParameters::new(0.0, 1.0)
        };
        assert_eq!(p.map(100.0), 100.0);
        let inv = SigmoidParameters::new(0.0, 1.0).set_inverse();
        assert_eq!(inv.map(1000.0), 0.0);
    }

    #[test]
    fn rounding_can_be_disabled() {
        let p = SigmoidParameters {
            round: false,
            ..SigmoidParameters::new(0.0, 1.0)
        };
        let v = p.map(0.1);
        assert!(v != v.round(), "expected unrounded value, got {v}");
    }

    #[test]
    fn config_overrides_apply_per_key() {
        let settings = Settings::from_json_str(
            r#"{ "measures_params": { "DynamicRange": { "sigmoid": { "x0": 3.0, "w": 0.5 } } } }"#,
        )
        .unwrap();
        let p = SigmoidParameters::new(0.0, 1.0)
            .load_overrides(&settings, MeasureId::DynamicRange);
        assert_eq!(p.x0, 3.0);
        assert_eq!(p.w, 0.5);
        // Untouched parameters keep their defaults
        assert_eq!(p.h, 100.0);
    }
}
