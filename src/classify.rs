//! GC background classification
//!
//! A batch is assigned to the configured bin label closest to its GC percentage. Batches with
//! no unambiguous bases cannot be classified and are sent to [`Bin::Discard`].

use std::fmt;

use crate::{Composition, Config};

/// Destination of a classified batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bin {
    /// A GC percentage label from the configured bin set
    Label(u32),
    /// The batch has no G/C/A/T bases and is never written
    Discard,
}
impl Bin {
    #[must_use]
    pub fn label(&self) -> Option<u32> {
        match self {
            Self::Label(label) => Some(*label),
            Self::Discard => None,
        }
    }

    #[must_use]
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Discard)
    }
}
impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "bin{label}"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

/// Maps a composition to the nearest bin label
#[derive(Debug, Clone)]
pub struct GcClassifier {
    bins: Vec<u32>,
}
impl GcClassifier {
    /// Creates a classifier over labels in tie-breaking order
    #[must_use]
    pub fn new(bins: Vec<u32>) -> Self {
        Self { bins }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bins.clone())
    }

    #[must_use]
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Classifies a composition
    ///
    /// Linear scan keeping the first label with the strictly smallest distance, so a GC
    /// percentage halfway between two labels goes to the one listed first.
    #[must_use]
    pub fn classify(&self, composition: Composition) -> Bin {
        let Some(gc) = composition.gc_percent() else {
            return Bin::Discard;
        };
        let mut nearest = Bin::Discard;
        let mut min_dist = f64::INFINITY;
        for &label in &self.bins {
            let dist = (f64::from(label) - gc).abs();
            if dist < min_dist {
                min_dist = dist;
                nearest = Bin::Label(label);
            }
        }
        nearest
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::config::DEFAULT_BINS;

    fn classifier() -> GcClassifier {
        GcClassifier::new(DEFAULT_BINS.to_vec())
    }

    #[test]
    fn test_tie_goes_to_first_listed() {
        let composition = Composition::count(b"GGCCAATT");
        assert_eq!(classifier().classify(composition), Bin::Label(49));

        let descending = GcClassifier::new(DEFAULT_BINS.iter().rev().copied().collect());
        assert_eq!(descending.classify(composition), Bin::Label(51));
    }

    #[test]
    fn test_extremes_clamp_to_outer_bins() {
        assert_eq!(
            classifier().classify(Composition::new(0, 100)),
            Bin::Label(35)
        );
        assert_eq!(
            classifier().classify(Composition::new(100, 0)),
            Bin::Label(53)
        );
    }

    #[test]
    fn test_nearest() {
        // 42.5% sits between 41 and 43, closer to 43
        assert_eq!(
            classifier().classify(Composition::new(17, 23)),
            Bin::Label(43)
        );
        // 40%
        assert_eq!(
            classifier().classify(Composition::new(2, 3)),
            Bin::Label(39)
        );
    }

    #[test]
    fn test_discard() {
        let bin = classifier().classify(Composition::default());
        assert!(bin.is_discard());
        assert_eq!(bin.label(), None);
        assert_eq!(bin.to_string(), "discard");
    }

    #[test]
    fn test_idempotent() {
        let composition = Composition::new(1234, 1766);
        let classifier = classifier();
        assert_eq!(
            classifier.classify(composition),
            classifier.classify(composition)
        );
    }
}
