//! # Calibrator subtypes
//!
//! A calibrator file records *which kind* of calibration solution it holds.
//! The kinds form a small closed hierarchy: a child subtype *is a* parent
//! subtype (every `van04e18` solution is a `CompleteJones` solution).
//!
//! ```text
//! Flux
//! CompleteJones
//! ├── van02eA1
//! ├── van04e18
//! └── Britton
//! SingleAxis
//! Polar
//! Hybrid
//! ```
//!
//! Matching uses the symmetric [`compatible`] predicate: two subtypes are
//! compatible when either one *is a* the other.
use std::{fmt, str::FromStr};

use crate::caldb_errors::ParseEntryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibratorType {
    /// Flux-density calibration solution
    Flux,
    /// Complete parameterization of the instrumental response
    CompleteJones,
    /// Complete-Jones model of van Straten (2002), appendix A1
    Van02eA1,
    /// Complete-Jones model of van Straten (2004), equation 18
    Van04e18,
    /// Complete-Jones model of Britton (2000)
    Britton,
    /// Differential gain, differential phase and absolute gain
    SingleAxis,
    /// Polar decomposition of the feed response
    Polar,
    /// Complete-Jones solution combined with a reference observation
    Hybrid,
}

const ALL_TYPES: [CalibratorType; 8] = [
    CalibratorType::Flux,
    CalibratorType::CompleteJones,
    CalibratorType::Van02eA1,
    CalibratorType::Van04e18,
    CalibratorType::Britton,
    CalibratorType::SingleAxis,
    CalibratorType::Polar,
    CalibratorType::Hybrid,
];

impl CalibratorType {
    /// Name used in catalog files
    pub fn name(&self) -> &'static str {
        match self {
            CalibratorType::Flux => "Flux",
            CalibratorType::CompleteJones => "CompleteJones",
            CalibratorType::Van02eA1 => "van02eA1",
            CalibratorType::Van04e18 => "van04e18",
            CalibratorType::Britton => "Britton",
            CalibratorType::SingleAxis => "SingleAxis",
            CalibratorType::Polar => "Polar",
            CalibratorType::Hybrid => "Hybrid",
        }
    }

    /// Immediate parent in the hierarchy, if any
    pub fn parent(&self) -> Option<CalibratorType> {
        match self {
            CalibratorType::Van02eA1 | CalibratorType::Van04e18 | CalibratorType::Britton => {
                Some(CalibratorType::CompleteJones)
            }
            _ => None,
        }
    }

    /// True if `self` is `other` or one of its descendants
    pub fn is_a(&self, other: CalibratorType) -> bool {
        let mut current = Some(*self);
        while let Some(t) = current {
            if t == other {
                return true;
            }
            current = t.parent();
        }
        false
    }

    /// Every known subtype
    pub fn all() -> &'static [CalibratorType] {
        &ALL_TYPES
    }
}

/// Symmetric compatibility between two optional subtypes.
///
/// Two absent subtypes are compatible; an absent and a present one are not;
/// otherwise either must be a descendant of the other.
pub fn compatible(a: Option<CalibratorType>, b: Option<CalibratorType>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_a(b) || b.is_a(a),
        _ => false,
    }
}

impl fmt::Display for CalibratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalibratorType {
    type Err = ParseEntryError;

    /// Resolve a subtype from its catalog name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TYPES
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ParseEntryError::UnknownType(s.to_string()))
    }
}

#[cfg(test)]
mod calibrator_type_test {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(CalibratorType::Van04e18.is_a(CalibratorType::CompleteJones));
        assert!(CalibratorType::Van04e18.is_a(CalibratorType::Van04e18));
        assert!(!CalibratorType::CompleteJones.is_a(CalibratorType::Van04e18));
        assert!(!CalibratorType::Hybrid.is_a(CalibratorType::CompleteJones));
        assert!(!CalibratorType::SingleAxis.is_a(CalibratorType::Polar));
    }

    #[test]
    fn test_compatible_is_symmetric() {
        for a in CalibratorType::all() {
            for b in CalibratorType::all() {
                assert_eq!(
                    compatible(Some(*a), Some(*b)),
                    compatible(Some(*b), Some(*a))
                );
            }
        }
        assert!(compatible(
            Some(CalibratorType::CompleteJones),
            Some(CalibratorType::Britton)
        ));
        assert!(!compatible(
            Some(CalibratorType::Van02eA1),
            Some(CalibratorType::Britton)
        ));
        assert!(compatible(None, None));
        assert!(!compatible(Some(CalibratorType::Flux), None));
    }

    #[test]
    fn test_from_str() {
        for t in CalibratorType::all() {
            assert_eq!(t.name().parse::<CalibratorType>().unwrap(), *t);
        }
        assert_eq!(
            "singleaxis".parse::<CalibratorType>().unwrap(),
            CalibratorType::SingleAxis
        );
        assert_eq!(
            "Bogus".parse::<CalibratorType>(),
            Err(ParseEntryError::UnknownType("Bogus".into()))
        );
    }
}
