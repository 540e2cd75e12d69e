use camino::Utf8Path;

use crate::{caldb_errors::CalDbError, observations::Observation};

/// Source of loaded observations.
///
/// Catalog construction and the calibrator pipelines never decode files
/// themselves; they ask a loader. Any closure
/// `Fn(&Utf8Path) -> Result<Observation, CalDbError>` is a loader.
///
/// Implementations must set [`Observation::filename`] to the name that was
/// loaded so that catalog entries can point back at the file.
pub trait ObservationLoader {
    fn load(&self, filename: &Utf8Path) -> Result<Observation, CalDbError>;
}

impl<F> ObservationLoader for F
where
    F: Fn(&Utf8Path) -> Result<Observation, CalDbError>,
{
    fn load(&self, filename: &Utf8Path) -> Result<Observation, CalDbError> {
        self(filename)
    }
}
