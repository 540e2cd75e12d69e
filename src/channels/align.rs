//! # Channel alignment
//!
//! A calibrator recorded with a finer or wider channelisation than the
//! observation it should calibrate cannot be applied channel by channel.
//! [`align_channels`] removes every calibrator channel with no counterpart in
//! the target observation, then forces the calibrator's recorded centre
//! frequency and bandwidth to the target's.
//!
//! Alignment is attempted only when
//! - both datasets have channels,
//! - the calibrator has more channels than the target,
//! - their bandwidths differ.
//!
//! Channels are pruned in every container that carries them: the
//! calibrator's solution extension (with the reference Stokes parameters
//! tagging along) and, when sub-integrations are present, the calibrator
//! observation itself.
use tracing::debug;

use crate::{
    caldb_errors::CalDbError,
    channels::match_channel,
    constants::{MHz, CHANNEL_MATCH_FRACTION},
    observations::{
        extensions::{CalibratorExtension, CalibratorStokes},
        Observation,
    },
};

/// Anything holding per-channel data that must shrink in step with a pruned container
pub trait ChannelTagAlong {
    fn remove_channel(&mut self, ichan: usize);
}

/// A per-channel dataset with a known centre frequency for every channel
pub trait ChannelContainer: ChannelTagAlong {
    fn nchan(&self) -> usize;
    fn channel_frequency(&self, ichan: usize) -> MHz;
}

impl ChannelTagAlong for Observation {
    fn remove_channel(&mut self, ichan: usize) {
        self.channel_frequencies.remove(ichan);
    }
}

impl ChannelContainer for Observation {
    fn nchan(&self) -> usize {
        self.channel_frequencies.len()
    }

    fn channel_frequency(&self, ichan: usize) -> MHz {
        self.channel_frequencies[ichan]
    }
}

impl ChannelTagAlong for CalibratorExtension {
    fn remove_channel(&mut self, ichan: usize) {
        self.channel_frequencies.remove(ichan);
        if ichan < self.parameters.len() {
            self.parameters.remove(ichan);
        }
    }
}

impl ChannelContainer for CalibratorExtension {
    fn nchan(&self) -> usize {
        self.channel_frequencies.len()
    }

    fn channel_frequency(&self, ichan: usize) -> MHz {
        self.channel_frequencies[ichan]
    }
}

impl ChannelTagAlong for CalibratorStokes {
    fn remove_channel(&mut self, ichan: usize) {
        if ichan < self.stokes.len() {
            self.stokes.remove(ichan);
        }
    }
}

/// Remove from `container` every channel with no counterpart in `target`
///
/// Arguments
/// -----------------
/// * `target`: the observation whose channels must be matched
/// * `container`: the calibrator data to prune
/// * `tag_along`: optional parallel data pruned at the same indices
///
/// Return
/// ----------
/// * the number of removed channels, or [`CalDbError::StructuralMismatch`] if the
///   pruned container does not end with exactly the target's channel count
pub fn remove_channels<C>(
    target: &Observation,
    container: &mut C,
    mut tag_along: Option<&mut dyn ChannelTagAlong>,
) -> Result<usize, CalDbError>
where
    C: ChannelContainer + ?Sized,
{
    let target_nchan = target.nchan();
    let chan_bw = (target.bandwidth / target_nchan as f64).abs();
    let tolerance = CHANNEL_MATCH_FRACTION * chan_bw;

    let mut removed = 0;
    let mut ichan = 0;
    while ichan < container.nchan() {
        let freq = container.channel_frequency(ichan);
        if match_channel(&target.channel_frequencies, freq, tolerance).is_ok() {
            ichan += 1;
            continue;
        }

        // retry the same index after removal
        container.remove_channel(ichan);
        if let Some(other) = tag_along.as_deref_mut() {
            other.remove_channel(ichan);
        }
        removed += 1;
    }

    debug!("removed {removed} calibrator channels with no counterpart in the target");

    if container.nchan() != target_nchan {
        return Err(CalDbError::StructuralMismatch {
            calibrator_nchan: container.nchan(),
            target_nchan,
        });
    }
    Ok(removed)
}

/// Reconcile the channels of `calibrator` with those of `target`
///
/// See the module documentation for when alignment applies. On success the
/// calibrator's centre frequency and bandwidth are overwritten with the
/// target's.
pub fn align_channels(
    calibrator: &mut Observation,
    target: &Observation,
) -> Result<(), CalDbError> {
    if calibrator.bandwidth == target.bandwidth
        || calibrator.nchan() <= target.nchan()
        || target.nchan() == 0
    {
        return Ok(());
    }

    debug!(
        "bandwidth mismatch ({} vs {} MHz), trying channel truncation of {}",
        calibrator.bandwidth, target.bandwidth, calibrator.filename
    );

    if let Some(ext) = calibrator.calibrator.as_mut() {
        let stokes = calibrator
            .calibrator_stokes
            .as_mut()
            .map(|s| s as &mut dyn ChannelTagAlong);
        remove_channels(target, ext, stokes)?;
    }

    if calibrator.nsubint() > 0 {
        remove_channels(target, calibrator, None)?;
    }

    calibrator.centre_frequency = target.centre_frequency;
    calibrator.bandwidth = target.bandwidth;
    Ok(())
}

#[cfg(test)]
mod align_test {
    use super::*;
    use crate::{calibrator_type::CalibratorType, time::epoch_from_mjd};
    use nalgebra::Vector4;

    fn target() -> Observation {
        Observation {
            centre_frequency: 1400.0,
            bandwidth: 300.0,
            subint_epochs: vec![epoch_from_mjd(60000.0)],
            ..Default::default()
        }
        .with_uniform_channels(12)
    }

    fn wide_calibrator() -> Observation {
        Observation {
            centre_frequency: 1400.0,
            bandwidth: 400.0,
            subint_epochs: vec![epoch_from_mjd(60000.0)],
            ..Default::default()
        }
        .with_uniform_channels(16)
    }

    #[test]
    fn test_prune_observation_channels() {
        let target = target();
        let mut cal = wide_calibrator();
        align_channels(&mut cal, &target).unwrap();

        assert_eq!(cal.nchan(), 12);
        assert_eq!(cal.channel_frequencies, target.channel_frequencies);
        assert_eq!(cal.centre_frequency, 1400.0);
        assert_eq!(cal.bandwidth, 300.0);
    }

    #[test]
    fn test_prune_extension_with_tag_along() {
        let target = target();
        let mut cal = wide_calibrator();
        cal.subint_epochs.clear();
        let freqs = cal.channel_frequencies.clone();
        let mut ext =
            CalibratorExtension::new(CalibratorType::SingleAxis, epoch_from_mjd(60000.0), freqs);
        ext.parameters = (0..16).map(|i| Some(vec![i as f64])).collect();
        cal.calibrator = Some(ext);
        cal.calibrator_stokes = Some(CalibratorStokes {
            stokes: (0..16).map(|i| Vector4::new(1.0, 0.0, 0.0, i as f64)).collect(),
        });

        align_channels(&mut cal, &target).unwrap();

        let ext = cal.calibrator.as_ref().unwrap();
        assert_eq!(ext.channel_frequencies.len(), 12);
        // the two lowest channels went away
        assert_eq!(ext.parameters[0], Some(vec![2.0]));
        let stokes = cal.calibrator_stokes.as_ref().unwrap();
        assert_eq!(stokes.stokes.len(), 12);
        assert_eq!(stokes.stokes[0][3], 2.0);
        // no sub-integrations: the observation channels are left alone
        assert_eq!(cal.nchan(), 16);
        assert_eq!(cal.bandwidth, 300.0);
    }

    #[test]
    fn test_structural_mismatch() {
        let target = target();
        let mut cal = Observation {
            centre_frequency: 1412.5,
            bandwidth: 400.0,
            subint_epochs: vec![epoch_from_mjd(60000.0)],
            ..Default::default()
        }
        .with_uniform_channels(16);

        assert_eq!(
            align_channels(&mut cal, &target),
            Err(CalDbError::StructuralMismatch {
                calibrator_nchan: 0,
                target_nchan: 12
            })
        );
    }

    #[test]
    fn test_no_alignment_needed() {
        let target = target();
        let mut same_bw = wide_calibrator();
        same_bw.bandwidth = 300.0;
        align_channels(&mut same_bw, &target).unwrap();
        assert_eq!(same_bw.nchan(), 16);

        let mut fewer = Observation {
            bandwidth: 400.0,
            ..Default::default()
        }
        .with_uniform_channels(8);
        align_channels(&mut fewer, &target).unwrap();
        assert_eq!(fewer.nchan(), 8);
    }
}
