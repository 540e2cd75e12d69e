#![allow(dead_code)]

use std::{cell::Cell, collections::HashMap};

use caldb::{
    observations::extensions::{Backend, CalibratorExtension, CalibratorStokes, Receiver},
    sky::SkyCoord,
    time::epoch_from_mjd,
    CalDbError, CalibratorType, ObsType, Observation, ObservationLoader,
};
use camino::{Utf8Path, Utf8PathBuf};
use hifitime::{Epoch, Unit};
use nalgebra::Vector4;

/// Epoch of the observation every test calibrates
pub const T0: f64 = 60000.0;

pub fn epoch_at(minutes: f64) -> Epoch {
    epoch_from_mjd(T0) + Unit::Minute * minutes
}

/// Observation `minutes` after [`T0`], 400 MHz around 1400 MHz in `nchan` channels
pub fn observation(name: &str, obs_type: ObsType, minutes: f64, nchan: usize) -> Observation {
    Observation {
        filename: name.into(),
        obs_type,
        coordinates: SkyCoord::new(150.0, -30.0),
        centre_frequency: 1400.0,
        bandwidth: 400.0,
        subint_epochs: vec![epoch_at(minutes)],
        backend: Some(Backend::new("PDFB4")),
        receiver: Some(Receiver::new("MULTI")),
        ..Default::default()
    }
    .with_uniform_channels(nchan)
}

/// Processed calibrator solution `minutes` after [`T0`]
pub fn solution(name: &str, cal_type: CalibratorType, minutes: f64, nchan: usize) -> Observation {
    let mut obs = observation(name, ObsType::Calibrator, minutes, nchan);
    obs.subint_epochs.clear();
    let mut ext =
        CalibratorExtension::new(cal_type, epoch_at(minutes), obs.channel_frequencies.clone());
    ext.parameters = (0..nchan).map(|i| Some(vec![i as f64])).collect();
    obs.calibrator = Some(ext);
    obs
}

/// Complete-Jones solution carrying the Stokes parameters of its reference source
pub fn complete_jones(name: &str, minutes: f64, nchan: usize) -> Observation {
    let mut obs = solution(name, CalibratorType::Van04e18, minutes, nchan);
    obs.calibrator_stokes = Some(CalibratorStokes {
        stokes: (0..nchan).map(|_| Vector4::new(1.0, 0.0, 0.0, 0.5)).collect(),
    });
    obs
}

/// In-memory loader counting every load
#[derive(Default)]
pub struct MemoryLoader {
    files: HashMap<Utf8PathBuf, Observation>,
    loads: Cell<usize>,
}

impl MemoryLoader {
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Self {
        MemoryLoader {
            files: observations
                .into_iter()
                .map(|obs| (obs.filename.clone(), obs))
                .collect(),
            loads: Cell::new(0),
        }
    }

    pub fn files(&self) -> Vec<Utf8PathBuf> {
        let mut names: Vec<_> = self.files.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl ObservationLoader for MemoryLoader {
    fn load(&self, filename: &Utf8Path) -> Result<Observation, CalDbError> {
        self.loads.set(self.loads.get() + 1);
        self.files
            .get(filename)
            .cloned()
            .ok_or_else(|| CalDbError::InvalidState(format!("{filename} is not loaded")))
    }
}
