//! Min-Max Wear Scaling

use crate::error::ValidationError;
use tracing::debug;

/// Fixed min-max bounds for tool wear.
///
/// Bounds are fitted once over the reference dataset and reused for every
/// scored row so scaled values stay comparable across calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WearScale {
    min: f64,
    max: f64,
}

impl WearScale {
    /// Create a scale from known bounds
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !min.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "wear_min".to_string(),
                value: min,
            });
        }
        if !max.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "wear_max".to_string(),
                value: max,
            });
        }
        if max <= min {
            return Err(ValidationError::DegenerateScale { min, max });
        }
        Ok(Self { min, max })
    }

    /// Fit bounds over a full dataset column
    pub fn fit<I>(values: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut count = 0usize;

        for v in values {
            if !v.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: "tool_wear".to_string(),
                    value: v,
                });
            }
            min = min.min(v);
            max = max.max(v);
            count += 1;
        }

        if count == 0 {
            return Err(ValidationError::MissingField("tool_wear".to_string()));
        }

        debug!("Fitted wear scale over {} values: [{}, {}]", count, min, max);
        Self::new(min, max)
    }

    /// Scale a raw value into [0, 1], clamping values outside the bounds
    pub fn scale(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bounds_map_to_unit_interval() {
        let scale = WearScale::new(0.0, 250.0).unwrap();
        assert_eq!(scale.scale(0.0), 0.0);
        assert_eq!(scale.scale(250.0), 1.0);
        assert!((scale.scale(150.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let scale = WearScale::new(10.0, 20.0).unwrap();
        assert_eq!(scale.scale(5.0), 0.0);
        assert_eq!(scale.scale(30.0), 1.0);
    }

    #[test]
    fn test_degenerate_scale() {
        assert_eq!(
            WearScale::new(5.0, 5.0),
            Err(ValidationError::DegenerateScale { min: 5.0, max: 5.0 })
        );
        assert!(matches!(
            WearScale::new(9.0, 1.0),
            Err(ValidationError::DegenerateScale { .. })
        ));
    }

    #[test]
    fn test_fit() {
        let scale = WearScale::fit(vec![3.0, 0.0, 253.0, 108.0]).unwrap();
        assert_eq!(scale.min(), 0.0);
        assert_eq!(scale.max(), 253.0);
    }

    #[test]
    fn test_fit_constant_column() {
        assert!(matches!(
            WearScale::fit(vec![7.0, 7.0, 7.0]),
            Err(ValidationError::DegenerateScale { .. })
        ));
    }

    #[test]
    fn test_fit_empty_and_nan() {
        assert!(matches!(
            WearScale::fit(Vec::new()),
            Err(ValidationError::MissingField(_))
        ));
        assert!(matches!(
            WearScale::fit(vec![1.0, f64::NAN]),
            Err(ValidationError::NonFinite { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_scaled_within_unit(min in -1e3f64..1e3, span in 1e-3f64..1e3, t in 0.0f64..=1.0) {
            let max = min + span;
            let scale = WearScale::new(min, max).unwrap();
            let w = min + t * span;
            let scaled = scale.scale(w);
            prop_assert!((0.0..=1.0).contains(&scaled));
        }
    }
}
