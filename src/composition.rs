use std::ops::AddAssign;

const STRONG: u8 = 1;
const WEAK: u8 = 2;

/// Lookup table mapping a base to its class (0 = ambiguous)
const BASE_CLASS: [u8; 256] = {
    let mut lut = [0u8; 256];
    lut[b'G' as usize] = STRONG;
    lut[b'g' as usize] = STRONG;
    lut[b'C' as usize] = STRONG;
    lut[b'c' as usize] = STRONG;
    lut[b'A' as usize] = WEAK;
    lut[b'a' as usize] = WEAK;
    lut[b'T' as usize] = WEAK;
    lut[b't' as usize] = WEAK;
    lut
};

/// Strong (G/C) and weak (A/T) base counts of a sequence region
///
/// Any other symbol (N, gaps, IUPAC codes) is ambiguous and counted in neither.
/// Each base must be added exactly once over the lifetime of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Composition {
    /// Number of G/C bases
    pub strong: u64,
    /// Number of A/T bases
    pub weak: u64,
}
impl Composition {
    #[must_use]
    pub fn new(strong: u64, weak: u64) -> Self {
        Self { strong, weak }
    }

    /// Counts the strong and weak bases of a slice (case-insensitive)
    #[must_use]
    pub fn count(bases: &[u8]) -> Self {
        let mut composition = Self::default();
        composition.add(bases);
        composition
    }

    /// Accumulates the bases of a slice that has not been counted before
    pub fn add(&mut self, bases: &[u8]) {
        for &b in bases {
            match BASE_CLASS[b as usize] {
                STRONG => self.strong += 1,
                WEAK => self.weak += 1,
                _ => {}
            }
        }
    }

    /// Number of unambiguous bases
    #[must_use]
    pub fn informative(&self) -> u64 {
        self.strong + self.weak
    }

    /// GC percentage over the unambiguous bases, `None` if there are none
    #[must_use]
    pub fn gc_percent(&self) -> Option<f64> {
        match self.informative() {
            0 => None,
            total => Some(100.0 * self.strong as f64 / total as f64),
        }
    }
}
impl AddAssign for Composition {
    fn add_assign(&mut self, rhs: Self) {
        self.strong += rhs.strong;
        self.weak += rhs.weak;
    }
}
