/// The accumulated state of a single feature.
///
/// `z` accumulates gradients minus the per-step weight adjustments and `n`
/// accumulates squared gradients, the weight is derived from both on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureCell {
    pub z: f32,
    pub n: f32,
}

impl FeatureCell {
    /// Creates a new `FeatureCell`.
    pub fn new(z: f32, n: f32) -> Self {
        Self { z, n }
    }

    /// Packs both accumulators into a single word, `z` in the high half.
    pub(crate) fn to_bits(self) -> u64 {
        ((self.z.to_bits() as u64) << 32) | self.n.to_bits() as u64
    }

    /// The inverse of `Self::to_bits`.
    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            z: f32::from_bits((bits >> 32) as u32),
            n: f32::from_bits(bits as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_keeps_both_halves() {
        let cell = FeatureCell::new(-3.25, 17.5);
        assert_eq!(FeatureCell::from_bits(cell.to_bits()), cell);
    }

    #[test]
    fn zero_cell_packs_to_zero() {
        assert_eq!(FeatureCell::default().to_bits(), 0);
    }

    #[test]
    fn negative_zero_is_not_folded() {
        let cell = FeatureCell::new(-0., 0.);
        let bits = FeatureCell::from_bits(cell.to_bits());
        assert!(bits.z.is_sign_negative());
    }
}
