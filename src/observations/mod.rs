//! # Loaded observations
//!
//! In-memory view of one observation file as seen by the catalog: the
//! matchable header metadata, per-sub-integration epochs, per-channel centre
//! frequencies and the named metadata extensions the calibrator pipelines
//! consume.
//!
//! Decoding archive files is not done here. An [`ObservationLoader`]
//! implementation produces [`Observation`] values from file names.
//!
//! ## Units & Conventions
//! -----------------
//! - **Frequencies and bandwidths** are in MHz. A negative bandwidth denotes an
//!   inverted band.
//! - **Epochs** are [`hifitime::Epoch`] values (UTC MJD on disk).
//! - The number of channels of an observation is the length of
//!   [`Observation::channel_frequencies`].
pub mod extensions;
pub mod loader;

use std::{fmt, str::FromStr};

use camino::Utf8PathBuf;
use hifitime::Epoch;

use crate::{
    caldb_errors::ParseEntryError,
    constants::MHz,
    observations::extensions::{
        Backend, CalibratorExtension, CalibratorStokes, FeedTransform, Receiver,
    },
    sky::SkyCoord,
};

pub use loader::ObservationLoader;

/// Kind of source observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObsType {
    #[default]
    Unknown,
    Pulsar,
    /// Raw observation of the reference (noise diode) signal
    PolnCal,
    /// Flux calibrator, on source
    FluxCalOn,
    /// Flux calibrator, off source
    FluxCalOff,
    /// Processed calibration solution
    Calibrator,
}

impl ObsType {
    /// Name used in catalog files
    pub fn name(&self) -> &'static str {
        match self {
            ObsType::Unknown => "Unknown",
            ObsType::Pulsar => "Pulsar",
            ObsType::PolnCal => "PolnCal",
            ObsType::FluxCalOn => "FluxCal-On",
            ObsType::FluxCalOff => "FluxCal-Off",
            ObsType::Calibrator => "Calibrator",
        }
    }
}

impl fmt::Display for ObsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObsType {
    type Err = ParseEntryError;

    /// Parse an observation type from its catalog name or a short alias
    /// (`PSR`, `CAL`, `FON`, `FOF`), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "unknown" => Ok(ObsType::Unknown),
            "pulsar" | "psr" => Ok(ObsType::Pulsar),
            "polncal" | "cal" => Ok(ObsType::PolnCal),
            "fluxcal-on" | "fluxcalon" | "fon" => Ok(ObsType::FluxCalOn),
            "fluxcal-off" | "fluxcaloff" | "fof" => Ok(ObsType::FluxCalOff),
            "calibrator" => Ok(ObsType::Calibrator),
            _ => Err(ParseEntryError::UnknownType(s.to_string())),
        }
    }
}

/// One loaded observation
///
/// # Fields
///
/// * `filename` - The file this observation was loaded from
/// * `obs_type` - The kind of source observed
/// * `coordinates` - The pointing position
/// * `centre_frequency` - The centre frequency of the band (MHz)
/// * `bandwidth` - The total bandwidth (MHz)
/// * `channel_frequencies` - Centre frequency of every channel of the first sub-integration (MHz)
/// * `subint_epochs` - Mid-time of every sub-integration
/// * `backend`, `receiver` - Instrument extensions
/// * `calibrator` - Solution extension of a processed calibrator
/// * `calibrator_stokes` - Reference-source Stokes parameters, per channel
/// * `feed` - Known feed transformation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Observation {
    pub filename: Utf8PathBuf,
    pub obs_type: ObsType,
    pub coordinates: SkyCoord,
    pub centre_frequency: MHz,
    pub bandwidth: MHz,
    pub channel_frequencies: Vec<MHz>,
    pub subint_epochs: Vec<Epoch>,
    pub backend: Option<Backend>,
    pub receiver: Option<Receiver>,
    pub calibrator: Option<CalibratorExtension>,
    pub calibrator_stokes: Option<CalibratorStokes>,
    pub feed: Option<FeedTransform>,
}

impl Observation {
    /// Number of frequency channels
    pub fn nchan(&self) -> usize {
        self.channel_frequencies.len()
    }

    /// Number of sub-integrations
    pub fn nsubint(&self) -> usize {
        self.subint_epochs.len()
    }

    /// Fill [`Observation::channel_frequencies`] with `nchan` evenly spaced channels
    /// spanning the band.
    pub fn with_uniform_channels(mut self, nchan: usize) -> Self {
        self.channel_frequencies = crate::channels::uniform_channel_frequencies(
            self.centre_frequency,
            self.bandwidth,
            nchan,
        );
        self
    }
}

#[cfg(test)]
mod observation_test {
    use super::*;

    #[test]
    fn test_obs_type_names() {
        for t in [
            ObsType::Unknown,
            ObsType::Pulsar,
            ObsType::PolnCal,
            ObsType::FluxCalOn,
            ObsType::FluxCalOff,
            ObsType::Calibrator,
        ] {
            assert_eq!(t.name().parse::<ObsType>().unwrap(), t);
        }
        assert_eq!("FON".parse::<ObsType>().unwrap(), ObsType::FluxCalOn);
        assert_eq!("psr".parse::<ObsType>().unwrap(), ObsType::Pulsar);
        assert!("SingleAxis".parse::<ObsType>().is_err());
    }

    #[test]
    fn test_uniform_channels() {
        let obs = Observation {
            centre_frequency: 1400.0,
            bandwidth: 400.0,
            ..Default::default()
        }
        .with_uniform_channels(4);

        assert_eq!(obs.nchan(), 4);
        assert_eq!(obs.channel_frequencies, vec![1250.0, 1350.0, 1450.0, 1550.0]);
    }
}
