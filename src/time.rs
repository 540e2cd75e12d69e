use hifitime::{Epoch, Unit};

use crate::constants::{Minute, MJD, ZERO_EPOCH_MJD};

/// Number of decimal digits written for catalog epochs (days)
const MJD_DIGITS: usize = 15;

/// Build an epoch from a modified julian date (UTC)
pub fn epoch_from_mjd(mjd: MJD) -> Epoch {
    Epoch::from_mjd_utc(mjd)
}

/// Transformation from an epoch to modified julian date (UTC days)
pub fn epoch_to_mjd(epoch: &Epoch) -> MJD {
    epoch.to_mjd_utc_days()
}

/// Parse a catalog epoch token, expressed in MJD days
///
/// Argument
/// --------
/// * `days`: a string such as `"55089.235096018510000"`
///
/// Return
/// ------
/// * the corresponding epoch, or `None` if the token is not a finite number
pub fn parse_mjd(days: &str) -> Option<Epoch> {
    let mjd: f64 = days.trim().parse().ok()?;
    mjd.is_finite().then(|| epoch_from_mjd(mjd))
}

/// Render an epoch as MJD days with the catalog precision
pub fn format_mjd(epoch: &Epoch) -> String {
    format!("{:.*}", MJD_DIGITS, epoch_to_mjd(epoch))
}

/// True when the epoch was never set (MJD zero)
pub fn is_zero_epoch(epoch: &Epoch) -> bool {
    epoch_to_mjd(epoch).abs() < ZERO_EPOCH_MJD
}

/// Signed difference `have - want`, in minutes
pub fn minutes_between(have: &Epoch, want: &Epoch) -> Minute {
    (*have - *want).to_unit(Unit::Minute)
}

/// Signed difference `have - want`, in seconds
pub fn seconds_between(have: &Epoch, want: &Epoch) -> f64 {
    (*have - *want).to_seconds()
}

/// Mean of a set of epochs
///
/// The mean is accumulated as offsets from the first epoch so that no precision
/// is lost to the magnitude of the MJD.
///
/// Return
/// ------
/// * `None` when `epochs` is empty
pub fn mean_epoch(epochs: &[Epoch]) -> Option<Epoch> {
    let (first, rest) = epochs.split_first()?;
    let offset: f64 = rest.iter().map(|e| seconds_between(e, first)).sum::<f64>();
    Some(*first + Unit::Second * (offset / epochs.len() as f64))
}

#[cfg(test)]
mod time_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mjd_round_trip() {
        let epoch = parse_mjd("59215.5").unwrap();
        assert_relative_eq!(epoch_to_mjd(&epoch), 59215.5, epsilon = 1e-9);

        let text = format_mjd(&epoch);
        assert_eq!(text.split('.').nth(1).map(str::len), Some(15));
        let back = parse_mjd(&text).unwrap();
        assert!(seconds_between(&back, &epoch).abs() < 1e-3);

        assert!(parse_mjd("not-a-date").is_none());
        assert!(parse_mjd("inf").is_none());
    }

    #[test]
    fn test_differences() {
        let t0 = epoch_from_mjd(59215.0);
        let t1 = t0 + Unit::Minute * 90.0;
        assert_relative_eq!(minutes_between(&t1, &t0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(minutes_between(&t0, &t1), -90.0, epsilon = 1e-9);
        assert_relative_eq!(seconds_between(&t1, &t0), 5400.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_epoch() {
        let t0 = epoch_from_mjd(60000.0);
        let epochs = [t0, t0 + Unit::Minute * 10.0, t0 + Unit::Minute * 20.0];
        let mean = mean_epoch(&epochs).unwrap();
        assert_relative_eq!(minutes_between(&mean, &t0), 10.0, epsilon = 1e-9);

        assert!(mean_epoch(&[]).is_none());
    }

    #[test]
    fn test_zero_epoch() {
        assert!(is_zero_epoch(&epoch_from_mjd(0.0)));
        assert!(!is_zero_epoch(&epoch_from_mjd(50000.0)));
    }
}
