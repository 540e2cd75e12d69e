//! # Sky coordinates
//!
//! Minimal equatorial position type used by catalog entries: parsing and
//! rendering in sexagesimal form, and the great-circle separation used by
//! both the matching criteria and duplicate detection.
use std::fmt;

use nalgebra::Vector3;

use crate::{
    constants::Degree,
    conversion::{format_dec_dms, format_ra_hms, parse_dec_to_deg, parse_ra_to_deg},
};

/// Equatorial sky position, angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SkyCoord {
    pub ra: Degree,
    pub dec: Degree,
}

impl SkyCoord {
    pub fn new(ra: Degree, dec: Degree) -> Self {
        SkyCoord { ra, dec }
    }

    /// Parse a position from its right ascension and declination strings
    ///
    /// Arguments
    /// ---------
    /// * `ra`: right ascension, `HH:MM:SS.SS`
    /// * `dec`: declination, `±DD:MM:SS.SS`
    ///
    /// Return
    /// ------
    /// * the position, or `None` if either component is malformed
    pub fn from_sexagesimal(ra: &str, dec: &str) -> Option<Self> {
        Some(SkyCoord {
            ra: parse_ra_to_deg(ra)?,
            dec: parse_dec_to_deg(dec)?,
        })
    }

    /// Right ascension rendered as `HH:MM:SS.SSSS`
    pub fn ra_hms(&self) -> String {
        format_ra_hms(self.ra)
    }

    /// Declination rendered as `±DD:MM:SS.SSS`
    pub fn dec_dms(&self) -> String {
        format_dec_dms(self.dec)
    }

    fn unit_vector(&self) -> Vector3<f64> {
        let (ra, dec) = (self.ra.to_radians(), self.dec.to_radians());
        Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
    }

    /// Great-circle separation between two positions, in degrees
    ///
    /// Uses `atan2(|a × b|, a · b)`, which stays accurate for both tiny and
    /// near-antipodal separations.
    pub fn angular_separation(&self, other: &SkyCoord) -> Degree {
        let a = self.unit_vector();
        let b = other.unit_vector();
        a.cross(&b).norm().atan2(a.dot(&b)).to_degrees()
    }
}

impl fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ra_hms(), self.dec_dms())
    }
}

#[cfg(test)]
mod sky_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_separation() {
        let a = SkyCoord::new(10.0, 20.0);
        assert_relative_eq!(a.angular_separation(&a), 0.0, epsilon = 1e-12);

        let b = SkyCoord::new(10.0, 25.0);
        assert_relative_eq!(a.angular_separation(&b), 5.0, epsilon = 1e-9);

        let pole = SkyCoord::new(0.0, 90.0);
        let other_pole = SkyCoord::new(123.0, 90.0);
        assert_relative_eq!(pole.angular_separation(&other_pole), 0.0, epsilon = 1e-9);

        let c = SkyCoord::new(0.0, 0.0);
        let d = SkyCoord::new(180.0, 0.0);
        assert_relative_eq!(c.angular_separation(&d), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sexagesimal() {
        let pos = SkyCoord::from_sexagesimal("12:30:00", "-45:30:00").unwrap();
        assert_relative_eq!(pos.ra, 187.5, epsilon = 1e-12);
        assert_relative_eq!(pos.dec, -45.5, epsilon = 1e-12);
        assert_eq!(pos.to_string(), "12:30:00.0000 -45:30:00.000");

        assert!(SkyCoord::from_sexagesimal("12:30", "-45:30:00").is_none());
    }
}
