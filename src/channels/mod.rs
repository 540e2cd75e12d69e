//! # Channel subset matching
//!
//! Comparison of the frequency-channel layouts of two datasets that were
//! binned independently:
//!
//! - [`match_channel`] locates one frequency among a set of channel centres,
//! - [`subset_match`] decides whether every channel of one layout is present
//!   in another (used by the optional channel-layout comparator of the
//!   matching criteria),
//! - [`align`] prunes a calibrator's channels down to a target observation's.
//!
//! Layouts stored in the catalog only carry `(centre frequency, bandwidth,
//! nchan)`; channel centres are recreated assuming uniform channelisation.
pub mod align;

use crate::{
    caldb_errors::CalDbError,
    constants::{MHz, CHANNEL_MATCH_FRACTION},
    database::entry::Entry,
};

/// Centre frequencies of `nchan` uniform channels spanning `bandwidth` around `centre`
pub fn uniform_channel_frequencies(centre: MHz, bandwidth: MHz, nchan: usize) -> Vec<MHz> {
    if nchan == 0 {
        return Vec::new();
    }
    let chan_bw = bandwidth / nchan as f64;
    let low = centre - bandwidth / 2.0;
    (0..nchan)
        .map(|i| low + (i as f64 + 0.5) * chan_bw)
        .collect()
}

/// Index of the channel whose centre lies within `tolerance` of `frequency`
///
/// Arguments
/// -----------------
/// * `channels`: channel centre frequencies (MHz)
/// * `frequency`: the frequency looked for (MHz)
/// * `tolerance`: maximum absolute difference (MHz)
///
/// Return
/// ----------
/// * the index of the closest channel within tolerance, or
///   [`CalDbError::ChannelNotFound`]
pub fn match_channel(
    channels: &[MHz],
    frequency: MHz,
    tolerance: MHz,
) -> Result<usize, CalDbError> {
    channels
        .iter()
        .enumerate()
        .map(|(i, f)| (i, (f - frequency).abs()))
        .filter(|(_, diff)| *diff < tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .ok_or(CalDbError::ChannelNotFound {
            frequency,
            tolerance,
        })
}

/// Uniform channel layout recreated from catalog metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLayout {
    pub centre_frequency: MHz,
    pub bandwidth: MHz,
    pub nchan: usize,
}

impl ChannelLayout {
    pub fn from_entry(entry: &Entry) -> Self {
        ChannelLayout {
            centre_frequency: entry.frequency,
            bandwidth: entry.bandwidth,
            nchan: entry.nchan,
        }
    }

    /// Absolute width of one channel
    pub fn channel_width(&self) -> Option<MHz> {
        (self.nchan > 0).then(|| (self.bandwidth / self.nchan as f64).abs())
    }

    pub fn frequencies(&self) -> Vec<MHz> {
        uniform_channel_frequencies(self.centre_frequency, self.bandwidth, self.nchan)
    }
}

/// Decide whether every channel of `subset` is also a channel of `superset`
///
/// Channels must have the same width (within [`CHANNEL_MATCH_FRACTION`] of the
/// subset's channel width) and every subset channel centre must coincide
/// with a superset channel centre within the same tolerance.
///
/// Return
/// ----------
/// * `Ok(())` on success, or the human-readable reason of the mismatch
pub fn subset_match(superset: &ChannelLayout, subset: &ChannelLayout) -> Result<(), String> {
    let (Some(super_width), Some(sub_width)) = (superset.channel_width(), subset.channel_width())
    else {
        return Err(format!(
            "no channels (superset nchan={} subset nchan={})",
            superset.nchan, subset.nchan
        ));
    };

    let tolerance = CHANNEL_MATCH_FRACTION * sub_width;

    if (super_width - sub_width).abs() > tolerance {
        return Err(format!(
            "channel bandwidth mismatch (superset={super_width} subset={sub_width} MHz)"
        ));
    }

    if subset.nchan > superset.nchan {
        return Err(format!(
            "subset has more channels than superset ({} > {})",
            subset.nchan, superset.nchan
        ));
    }

    let super_freqs = superset.frequencies();
    for (ichan, freq) in subset.frequencies().into_iter().enumerate() {
        if match_channel(&super_freqs, freq, tolerance).is_err() {
            return Err(format!("channel {ichan} at {freq} MHz not in superset"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod channels_test {
    use super::*;

    fn layout(centre: MHz, bandwidth: MHz, nchan: usize) -> ChannelLayout {
        ChannelLayout {
            centre_frequency: centre,
            bandwidth,
            nchan,
        }
    }

    #[test]
    fn test_match_channel() {
        let chans = uniform_channel_frequencies(1400.0, 400.0, 4);
        assert_eq!(match_channel(&chans, 1350.2, 0.5).unwrap(), 1);
        assert_eq!(
            match_channel(&chans, 1300.0, 0.5),
            Err(CalDbError::ChannelNotFound {
                frequency: 1300.0,
                tolerance: 0.5
            })
        );
    }

    #[test]
    fn test_subset_match() {
        // 16 x 25 MHz from 1200 to 1600, subset: the central 12 channels
        let superset = layout(1400.0, 400.0, 16);
        let subset = layout(1400.0, 300.0, 12);
        assert_eq!(subset_match(&superset, &subset), Ok(()));

        // half-channel offset
        let shifted = layout(1412.5, 300.0, 12);
        assert!(subset_match(&superset, &shifted)
            .unwrap_err()
            .contains("not in superset"));

        // different channel width
        let coarse = layout(1400.0, 400.0, 8);
        assert!(subset_match(&superset, &coarse)
            .unwrap_err()
            .contains("bandwidth mismatch"));

        assert!(subset_match(&superset, &layout(1400.0, 400.0, 0)).is_err());
    }

    #[test]
    fn test_inverted_band() {
        let chans = uniform_channel_frequencies(1400.0, -400.0, 4);
        assert_eq!(chans, vec![1550.0, 1450.0, 1350.0, 1250.0]);
        let superset = layout(1400.0, -400.0, 4);
        let subset = layout(1400.0, 200.0, 2);
        assert_eq!(subset_match(&superset, &subset), Ok(()));
    }
}
