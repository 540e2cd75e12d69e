//! # Calibration models
//!
//! Values produced by the synthesis pipelines of
//! [`Database`](crate::database::Database). Each model owns the loaded and
//! channel-aligned observations it was built from; fitting and applying the
//! calibration are the business of downstream consumers.
//!
//! | model                  | built from                                              |
//! |------------------------|---------------------------------------------------------|
//! | [`FluxCalibrator`]     | one processed flux solution, or raw on/off observations |
//! | [`ReferenceCalibrator`]| one raw reference-signal (PolnCal) observation          |
//! | [`SolvedCalibrator`]   | one processed polarization solution                     |
//! | [`HybridCalibrator`]   | a complete-Jones solution plus a reference calibrator   |
//!
//! The polarization pipeline returns any of the last three as a [`PolnCalibrator`].
use std::sync::Arc;

use crate::{
    caldb_errors::CalDbError,
    calibrator_type::CalibratorType,
    observations::{extensions::CalibratorStokes, ObsType, Observation},
};

/// Flux calibration model
#[derive(Debug, Clone, PartialEq)]
pub enum FluxCalibrator {
    /// Already solved flux calibrator
    Processed(Observation),
    /// To be solved from raw on-source and off-source observations
    Raw {
        on: Vec<Observation>,
        off: Vec<Observation>,
    },
}

impl FluxCalibrator {
    /// Model from a processed flux solution
    pub fn processed(solution: Observation) -> Result<Self, CalDbError> {
        let cal_type = solution.calibrator.as_ref().map(|ext| ext.cal_type);
        if cal_type != Some(CalibratorType::Flux) {
            return Err(CalDbError::InvalidParam(format!(
                "{} is not a processed flux calibrator",
                solution.filename
            )));
        }
        Ok(FluxCalibrator::Processed(solution))
    }

    /// Model from raw observations of the flux calibrator on and off source
    ///
    /// Return
    /// ----------
    /// * [`CalDbError::InvalidState`] if either set is empty, or
    ///   [`CalDbError::InvalidParam`] if an observation has the wrong type
    pub fn raw(on: Vec<Observation>, off: Vec<Observation>) -> Result<Self, CalDbError> {
        if on.is_empty() || off.is_empty() {
            return Err(CalDbError::InvalidState(format!(
                "flux calibrator needs both on and off observations (on={} off={})",
                on.len(),
                off.len()
            )));
        }
        let wrong = on
            .iter()
            .filter(|o| o.obs_type != ObsType::FluxCalOn)
            .chain(off.iter().filter(|o| o.obs_type != ObsType::FluxCalOff))
            .next();
        if let Some(obs) = wrong {
            return Err(CalDbError::InvalidParam(format!(
                "{} has unexpected type {}",
                obs.filename, obs.obs_type
            )));
        }
        Ok(FluxCalibrator::Raw { on, off })
    }

    /// Every observation this model was built from
    pub fn observations(&self) -> Vec<&Observation> {
        match self {
            FluxCalibrator::Processed(obs) => vec![obs],
            FluxCalibrator::Raw { on, off } => on.iter().chain(off).collect(),
        }
    }
}

/// Polarization model to be fitted from the reference signal
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCalibrator {
    pub cal_type: CalibratorType,
    pub observation: Observation,
}

impl ReferenceCalibrator {
    pub fn new(cal_type: CalibratorType, observation: Observation) -> Result<Self, CalDbError> {
        if observation.obs_type != ObsType::PolnCal {
            return Err(CalDbError::InvalidParam(format!(
                "{} is a {} observation, not a reference signal",
                observation.filename, observation.obs_type
            )));
        }
        Ok(ReferenceCalibrator {
            cal_type,
            observation,
        })
    }
}

/// Polarization model read back from a processed solution
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedCalibrator {
    pub solution: Observation,
}

impl SolvedCalibrator {
    pub fn new(solution: Observation) -> Result<Self, CalDbError> {
        if solution.calibrator.is_none() {
            return Err(CalDbError::MissingMetadata(format!(
                "{} has no calibrator extension",
                solution.filename
            )));
        }
        Ok(SolvedCalibrator { solution })
    }

    pub fn cal_type(&self) -> Option<CalibratorType> {
        self.solution.calibrator.as_ref().map(|ext| ext.cal_type)
    }
}

/// Complete-Jones solution combined with a specific reference observation
#[derive(Debug, Clone, PartialEq)]
pub struct HybridCalibrator {
    pub solution: Observation,
    /// Stokes parameters of the reference source stored with the solution
    pub reference_input: Option<CalibratorStokes>,
    pub reference: ReferenceCalibrator,
}

impl HybridCalibrator {
    pub fn new(solution: Observation, reference: ReferenceCalibrator) -> Result<Self, CalDbError> {
        let complete = solution
            .calibrator
            .as_ref()
            .is_some_and(|ext| ext.cal_type.is_a(CalibratorType::CompleteJones));
        if !complete {
            return Err(CalDbError::InvalidParam(format!(
                "{} is not a complete parameterization",
                solution.filename
            )));
        }
        let reference_input = solution.calibrator_stokes.clone();
        Ok(HybridCalibrator {
            solution,
            reference_input,
            reference,
        })
    }
}

/// Model returned by the polarization pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PolnCalibrator {
    Solved(SolvedCalibrator),
    Reference(ReferenceCalibrator),
    Hybrid(Arc<HybridCalibrator>),
}

impl PolnCalibrator {
    /// Calibrator subtype of the model
    pub fn cal_type(&self) -> Option<CalibratorType> {
        match self {
            PolnCalibrator::Solved(s) => s.cal_type(),
            PolnCalibrator::Reference(r) => Some(r.cal_type),
            PolnCalibrator::Hybrid(_) => Some(CalibratorType::Hybrid),
        }
    }

    /// File name of the observation the model was primarily built from
    pub fn filename(&self) -> &camino::Utf8Path {
        match self {
            PolnCalibrator::Solved(s) => &s.solution.filename,
            PolnCalibrator::Reference(r) => &r.observation.filename,
            PolnCalibrator::Hybrid(h) => &h.solution.filename,
        }
    }
}
