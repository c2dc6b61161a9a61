//! Per-channel gamma correction lookup table.

/// Exponents outside this range fall back to the identity curve.
pub const GAMMA_RANGE: std::ops::RangeInclusive<f32> = 0.01..=50.0;

/// Default exponent.
pub const DEFAULT_GAMMA: f32 = 1.0;

/// 256-entry brightness correction table, built once at init.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaCurve {
    table: [u8; 256],
}

impl GammaCurve {
    /// Build the curve `round(255 * (x / 255) ^ gamma)`.
    ///
    /// A non-finite or out-of-range exponent yields the identity curve.
    pub fn new(gamma: f32) -> Self {
        let gamma = Self::sanitize(gamma);
        let mut table = [0u8; 256];
        for (x, out) in table.iter_mut().enumerate() {
            let f = 255.0 * (x as f32 / 255.0).powf(gamma);
            *out = f.clamp(0.0, 255.0).round() as u8;
        }
        Self { table }
    }

    pub fn identity() -> Self {
        Self::new(DEFAULT_GAMMA)
    }

    /// The exponent actually used for a configured value.
    pub fn sanitize(gamma: f32) -> f32 {
        if gamma.is_finite() && GAMMA_RANGE.contains(&gamma) {
            gamma
        } else {
            DEFAULT_GAMMA
        }
    }

    #[inline]
    pub fn apply(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(x, &v)| x == v as usize)
    }
}

impl Default for GammaCurve {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Debug for GammaCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaCurve")
            .field("identity", &self.is_identity())
            .field("mid", &self.table[128])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_gamma_is_identity() {
        let curve = GammaCurve::new(1.0);
        for x in 0..=255u8 {
            assert_eq!(curve.apply(x), x);
        }
    }

    #[test]
    fn curves_are_monotonic() {
        for gamma in [0.01, 0.45, 1.0, 2.2, 2.8, 10.0, 50.0] {
            let curve = GammaCurve::new(gamma);
            for pair in curve.table().windows(2) {
                assert!(pair[0] <= pair[1], "gamma {gamma} not monotonic");
            }
        }
    }

    #[test]
    fn endpoints_are_fixed() {
        let curve = GammaCurve::new(2.2);
        assert_eq!(curve.apply(0), 0);
        assert_eq!(curve.apply(255), 255);
        assert!(curve.apply(128) < 128);
    }

    #[test]
    fn out_of_range_falls_back_to_identity() {
        for gamma in [0.0, 0.009, 100.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(GammaCurve::new(gamma).is_identity(), "gamma {gamma}");
        }
    }

    #[test]
    fn range_edges_are_accepted() {
        assert_eq!(GammaCurve::sanitize(0.01), 0.01);
        assert_eq!(GammaCurve::sanitize(50.0), 50.0);
        assert!(!GammaCurve::new(50.0).is_identity());
    }
}
