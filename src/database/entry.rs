//! # Catalog entries
//!
//! An [`Entry`] summarises the matchable metadata of one calibration or
//! science file. Entries are built either from one line of a catalog summary
//! file ([`FromStr`]) or from a loaded [`Observation`]
//! ([`Entry::from_observation`]), and written back with [`fmt::Display`].
//!
//! ## Line format
//!
//! ```text
//! filename type RA DEC epoch bandwidth frequency nchan instrument receiver
//! ```
//!
//! * `type` is an observation type (`Pulsar`, `PolnCal`, `FluxCal-On`, …) or,
//!   for processed solutions, the calibrator subtype name (`SingleAxis`,
//!   `CompleteJones`, …).
//! * `RA DEC` are sexagesimal (`HH:MM:SS.SSSS ±DD:MM:SS.SSS`); a single
//!   `RA,DEC` token is also accepted.
//! * `epoch` is the UTC MJD in days; `bandwidth` and `frequency` are in MHz.
//!
//! ## Equality
//!
//! Two entries are equal (duplicates) when type, calibrator subtype
//! compatibility, bandwidth, frequency, instrument and receiver agree, and the
//! epochs differ by less than [`DUPLICATE_EPOCH_SECONDS`] and the positions by
//! less than [`DUPLICATE_SEPARATION_DEGREES`]. The filename is not compared.
use std::{cmp::Ordering, fmt, str::FromStr};

use camino::Utf8PathBuf;
use hifitime::Epoch;

use crate::{
    caldb_errors::{CalDbError, ParseEntryError},
    calibrator_type::{compatible, CalibratorType},
    constants::{
        MHz, DUPLICATE_EPOCH_SECONDS, DUPLICATE_SEPARATION_DEGREES, ENTRY_TOKENS,
    },
    observations::{ObsType, Observation},
    sky::SkyCoord,
    time::{epoch_from_mjd, format_mjd, mean_epoch, parse_mjd, seconds_between},
};

/// One catalog record
#[derive(Debug, Clone)]
pub struct Entry {
    /// File name, relative to `path` unless absolute
    pub filename: Utf8PathBuf,
    /// Base directory of the catalog that holds this entry
    pub path: Option<Utf8PathBuf>,
    pub obs_type: ObsType,
    /// Only meaningful when `obs_type` is [`ObsType::Calibrator`]
    pub cal_type: Option<CalibratorType>,
    pub position: SkyCoord,
    pub epoch: Epoch,
    pub bandwidth: MHz,
    pub frequency: MHz,
    pub nchan: usize,
    pub instrument: String,
    pub receiver: String,
}

impl Entry {
    /// Empty search target of the given type
    ///
    /// Used when no observation is available to describe the wanted
    /// parameters; only the type is meaningful.
    pub fn for_type(obs_type: ObsType, cal_type: Option<CalibratorType>) -> Self {
        Entry {
            filename: Utf8PathBuf::new(),
            path: None,
            obs_type,
            cal_type,
            position: SkyCoord::default(),
            epoch: epoch_from_mjd(0.0),
            bandwidth: 0.0,
            frequency: 0.0,
            nchan: 0,
            instrument: String::new(),
            receiver: String::new(),
        }
    }

    /// Extract the matchable metadata of a loaded observation
    ///
    /// Arguments
    /// -----------------
    /// * `obs`: the loaded observation
    ///
    /// Return
    /// ----------
    /// * the entry, or [`CalDbError::MissingMetadata`] if the observation has no
    ///   backend or receiver extension, if a processed calibrator has no
    ///   calibrator extension, or if any other observation has no sub-integration.
    ///   Backend and receiver names must be non-empty and free of whitespace.
    ///
    /// The epoch of a processed calibrator is the epoch of its solution;
    /// otherwise it is the mean of the sub-integration epochs.
    pub fn from_observation(obs: &Observation) -> Result<Self, CalDbError> {
        let backend = obs.backend.as_ref().ok_or_else(|| {
            CalDbError::MissingMetadata(format!("{} has no backend extension", obs.filename))
        })?;
        let receiver = obs.receiver.as_ref().ok_or_else(|| {
            CalDbError::MissingMetadata(format!("{} has no receiver extension", obs.filename))
        })?;

        let (epoch, cal_type) = if obs.obs_type == ObsType::Calibrator {
            let ext = obs.calibrator.as_ref().ok_or_else(|| {
                CalDbError::MissingMetadata(format!(
                    "{} has no calibrator extension",
                    obs.filename
                ))
            })?;
            (ext.epoch, Some(ext.cal_type))
        } else {
            let epoch = mean_epoch(&obs.subint_epochs).ok_or_else(|| {
                CalDbError::MissingMetadata(format!("{} has no integrations", obs.filename))
            })?;
            (epoch, None)
        };

        let entry = Entry {
            filename: obs.filename.clone(),
            path: None,
            obs_type: obs.obs_type,
            cal_type,
            position: obs.coordinates,
            epoch,
            bandwidth: obs.bandwidth,
            frequency: obs.centre_frequency,
            nchan: obs.nchan(),
            instrument: backend.name.clone(),
            receiver: receiver.name.clone(),
        };

        if let Some((field, name)) = entry.malformed_name() {
            return Err(CalDbError::MissingMetadata(format!(
                "{} has {field} name '{name}', which is not a single token",
                obs.filename
            )));
        }
        Ok(entry)
    }

    /// First instrument or receiver name that cannot be written as one catalog token
    pub(crate) fn malformed_name(&self) -> Option<(&'static str, &str)> {
        [
            ("instrument", self.instrument.as_str()),
            ("receiver", self.receiver.as_str()),
        ]
        .into_iter()
        .find(|(_, name)| name.is_empty() || name.contains(char::is_whitespace))
    }

    /// Name written in the type column
    pub fn type_name(&self) -> &'static str {
        match (self.obs_type, self.cal_type) {
            (ObsType::Calibrator, Some(cal)) => cal.name(),
            (obs_type, _) => obs_type.name(),
        }
    }

    /// True when this entry describes an already solved calibration model
    pub fn is_solved(&self) -> bool {
        self.obs_type == ObsType::Calibrator
    }

    /// Catalog ordering: instrument, receiver, frequency, bandwidth, then epoch
    pub fn catalog_cmp(&self, other: &Entry) -> Ordering {
        self.instrument
            .cmp(&other.instrument)
            .then_with(|| self.receiver.cmp(&other.receiver))
            .then_with(|| self.frequency.total_cmp(&other.frequency))
            .then_with(|| self.bandwidth.total_cmp(&other.bandwidth))
            .then_with(|| seconds_between(&self.epoch, &other.epoch).total_cmp(&0.0))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.obs_type == other.obs_type
            && compatible(self.cal_type, other.cal_type)
            && self.bandwidth == other.bandwidth
            && self.frequency == other.frequency
            && self.instrument == other.instrument
            && self.receiver == other.receiver
            && seconds_between(&self.epoch, &other.epoch).abs() < DUPLICATE_EPOCH_SECONDS
            && self.position.angular_separation(&other.position) < DUPLICATE_SEPARATION_DEGREES
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.filename,
            self.type_name(),
            self.position,
            format_mjd(&self.epoch),
            self.bandwidth,
            self.frequency,
            self.nchan,
            self.instrument,
            self.receiver
        )
    }
}

fn parse_number<T: FromStr>(field: &'static str, token: &str) -> Result<T, ParseEntryError> {
    token.parse().map_err(|_| ParseEntryError::InvalidNumber {
        field,
        value: token.to_string(),
    })
}

fn parse_type(token: &str) -> Result<(ObsType, Option<CalibratorType>), ParseEntryError> {
    if let Ok(obs_type) = token.parse::<ObsType>() {
        return Ok((obs_type, None));
    }
    let cal_type = token.parse::<CalibratorType>()?;
    Ok((ObsType::Calibrator, Some(cal_type)))
}

fn parse_position(ra: &str, dec: &str) -> Result<SkyCoord, ParseEntryError> {
    SkyCoord::from_sexagesimal(ra, dec)
        .ok_or_else(|| ParseEntryError::InvalidCoordinates(format!("{ra} {dec}")))
}

impl FromStr for Entry {
    type Err = ParseEntryError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let joined_position = tokens.get(2).is_some_and(|t| t.contains(','));
        let expected = if joined_position {
            ENTRY_TOKENS - 1
        } else {
            ENTRY_TOKENS
        };

        if tokens.len() == expected - 1 {
            return Err(ParseEntryError::EmptyReceiver(line.trim().to_string()));
        }
        if tokens.len() < expected {
            return Err(ParseEntryError::MissingFields {
                expected,
                found: tokens.len(),
                line: line.trim().to_string(),
            });
        }
        if tokens.len() > expected {
            return Err(ParseEntryError::TrailingFields {
                expected,
                found: tokens.len(),
                line: line.trim().to_string(),
            });
        }

        let (obs_type, cal_type) = parse_type(tokens[1])?;

        let (position, rest) = if joined_position {
            let (ra, dec) = tokens[2]
                .split_once(',')
                .ok_or_else(|| ParseEntryError::InvalidCoordinates(tokens[2].to_string()))?;
            (parse_position(ra, dec)?, &tokens[3..])
        } else {
            (parse_position(tokens[2], tokens[3])?, &tokens[4..])
        };

        let epoch =
            parse_mjd(rest[0]).ok_or_else(|| ParseEntryError::InvalidEpoch(rest[0].to_string()))?;

        Ok(Entry {
            filename: Utf8PathBuf::from(tokens[0]),
            path: None,
            obs_type,
            cal_type,
            position,
            epoch,
            bandwidth: parse_number("bandwidth", rest[1])?,
            frequency: parse_number("frequency", rest[2])?,
            nchan: parse_number("nchan", rest[3])?,
            instrument: rest[4].to_string(),
            receiver: rest[5].to_string(),
        })
    }
}

#[cfg(test)]
mod entry_test {
    use super::*;
    use crate::observations::extensions::{Backend, CalibratorExtension, Receiver};
    use approx::assert_relative_eq;

    const LINE: &str = "cal/J1022+1001.cf SingleAxis 10:22:57.9960 +10:01:52.760 \
                        55089.235096018510000 -64 1369 256 PDFB3 MULTI";

    #[test]
    fn test_parse_line() {
        let entry: Entry = LINE.parse().unwrap();
        assert_eq!(entry.filename, "cal/J1022+1001.cf");
        assert_eq!(entry.obs_type, ObsType::Calibrator);
        assert_eq!(entry.cal_type, Some(CalibratorType::SingleAxis));
        assert_relative_eq!(entry.position.ra, 155.74165, epsilon = 1e-6);
        assert_relative_eq!(entry.position.dec, 10.031322222, epsilon = 1e-6);
        assert_eq!(entry.bandwidth, -64.0);
        assert_eq!(entry.frequency, 1369.0);
        assert_eq!(entry.nchan, 256);
        assert_eq!(entry.instrument, "PDFB3");
        assert_eq!(entry.receiver, "MULTI");
    }

    #[test]
    fn test_line_round_trip() {
        let entry: Entry = LINE.parse().unwrap();
        let text = entry.to_string();
        let back: Entry = text.parse().unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.filename, entry.filename);
        assert!(text.starts_with("cal/J1022+1001.cf SingleAxis 10:22:57.9960 +10:01:52.760 "));
    }

    #[test]
    fn test_joined_coordinates() {
        let entry: Entry =
            "psr.ar PSR 10:22:57.996,+10:01:52.76 55089.2 64 1369 256 PDFB3 MULTI"
                .parse()
                .unwrap();
        assert_eq!(entry.obs_type, ObsType::Pulsar);
        assert_eq!(entry.receiver, "MULTI");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "a.ar Pulsar 10:00:00 +10:00:00".parse::<Entry>().unwrap_err(),
            ParseEntryError::MissingFields {
                expected: 10,
                found: 4,
                line: "a.ar Pulsar 10:00:00 +10:00:00".into()
            }
        );
        assert!(matches!(
            "a.ar Pulsar 10:00:00 +10:00:00 55000 64 1369 256 PDFB3".parse::<Entry>(),
            Err(ParseEntryError::EmptyReceiver(_))
        ));
        assert_eq!(
            "a.ar Nonsense 10:00:00 +10:00:00 55000 64 1369 256 PDFB3 MULTI"
                .parse::<Entry>()
                .unwrap_err(),
            ParseEntryError::UnknownType("Nonsense".into())
        );
        assert!(matches!(
            "a.ar Pulsar 10:00:00 +10:00:00 55000 64 1369 many PDFB3 MULTI".parse::<Entry>(),
            Err(ParseEntryError::InvalidNumber { field: "nchan", .. })
        ));
        assert!(matches!(
            "a.ar Pulsar 25:00:00 +10:00:00 55000 64 1369 256 PDFB3 MULTI".parse::<Entry>(),
            Err(ParseEntryError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert_eq!(
            "a.ar Pulsar 10:00:00 +10:00:00 55000 64 1369 256 PDFB3 H OH"
                .parse::<Entry>()
                .unwrap_err(),
            ParseEntryError::TrailingFields {
                expected: 10,
                found: 11,
                line: "a.ar Pulsar 10:00:00 +10:00:00 55000 64 1369 256 PDFB3 H OH".into()
            }
        );
        assert!(matches!(
            "a.ar Pulsar 10:00:00,+10:00:00 55000 64 1369 256 PDFB3 MULTI extra".parse::<Entry>(),
            Err(ParseEntryError::TrailingFields { expected: 9, .. })
        ));
    }

    #[test]
    fn test_duplicate_equality() {
        let a: Entry = LINE.parse().unwrap();
        let mut b = a.clone();
        b.filename = "other.cf".into();
        b.epoch += hifitime::Unit::Second * 9.0;
        assert_eq!(a, b);

        b.epoch += hifitime::Unit::Second * 2.0;
        assert_ne!(a, b);

        let mut c = a.clone();
        c.cal_type = Some(CalibratorType::CompleteJones);
        assert_ne!(a, c);

        let mut d = a.clone();
        d.position = SkyCoord::new(a.position.ra + 0.2, a.position.dec);
        assert_ne!(a, d);
    }

    #[test]
    fn test_from_observation() {
        let epochs = vec![epoch_from_mjd(60000.0), epoch_from_mjd(60000.5)];
        let mut obs = Observation {
            filename: "psr.ar".into(),
            obs_type: ObsType::Pulsar,
            centre_frequency: 1400.0,
            bandwidth: 400.0,
            subint_epochs: epochs,
            backend: Some(Backend::new("PDFB3")),
            receiver: Some(Receiver::new("MULTI")),
            ..Default::default()
        }
        .with_uniform_channels(8);

        let entry = Entry::from_observation(&obs).unwrap();
        assert_eq!(entry.nchan, 8);
        assert_relative_eq!(crate::time::epoch_to_mjd(&entry.epoch), 60000.25, epsilon = 1e-9);

        obs.subint_epochs.clear();
        assert!(matches!(
            Entry::from_observation(&obs),
            Err(CalDbError::MissingMetadata(_))
        ));

        obs.obs_type = ObsType::Calibrator;
        assert!(matches!(
            Entry::from_observation(&obs),
            Err(CalDbError::MissingMetadata(_))
        ));

        obs.calibrator = Some(CalibratorExtension::new(
            CalibratorType::Britton,
            epoch_from_mjd(60001.0),
            vec![],
        ));
        let entry = Entry::from_observation(&obs).unwrap();
        assert_eq!(entry.cal_type, Some(CalibratorType::Britton));
        assert_eq!(entry.type_name(), "Britton");

        obs.receiver = None;
        assert!(Entry::from_observation(&obs).is_err());
    }

    #[test]
    fn test_names_must_be_single_tokens() {
        let mut obs = Observation {
            filename: "cal.cf".into(),
            obs_type: ObsType::PolnCal,
            subint_epochs: vec![epoch_from_mjd(60000.0)],
            backend: Some(Backend::new("PDFB4")),
            receiver: Some(Receiver::new("H OH")),
            ..Default::default()
        }
        .with_uniform_channels(4);

        let err = Entry::from_observation(&obs).unwrap_err();
        assert!(matches!(err, CalDbError::MissingMetadata(ref m) if m.contains("receiver")));

        obs.receiver = Some(Receiver::new("H-OH"));
        obs.backend = Some(Backend::new(""));
        let err = Entry::from_observation(&obs).unwrap_err();
        assert!(matches!(err, CalDbError::MissingMetadata(ref m) if m.contains("instrument")));

        obs.backend = Some(Backend::new("PDFB4"));
        let entry = Entry::from_observation(&obs).unwrap();
        assert_eq!(entry.malformed_name(), None);
        let back: Entry = entry.to_string().parse().unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.receiver, "H-OH");
    }
}
