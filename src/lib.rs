//! Catalog of pulsar calibration observations: selection of the calibrator
//! best suited to an observation, and synthesis of flux, polarization and
//! hybrid calibration models from the selected files.
pub mod caldb_errors;
pub mod calibrator_type;
pub mod calibrators;
pub mod channels;
pub mod constants;
mod conversion;
pub mod database;
pub mod observations;
pub mod params;
pub mod sky;
pub mod time;

pub use caldb_errors::{CalDbError, ParseEntryError, ResultExt};
pub use calibrator_type::CalibratorType;
pub use calibrators::{
    FluxCalibrator, HybridCalibrator, PolnCalibrator, ReferenceCalibrator, SolvedCalibrator,
};
pub use database::{
    criteria::{Checks, Criteria, Sequence},
    entry::Entry,
    search::{AllMatches, SearchOutcome},
    Database,
};
pub use observations::{ObsType, Observation, ObservationLoader};
pub use params::DatabaseParams;
