//! # Catalog searches
//!
//! Linear scans of the catalog driven by a
//! [`Criteria`](crate::database::criteria::Criteria):
//!
//! - [`Database::best_match`] keeps the matching entry closest in time to the
//!   target,
//! - [`Database::all_matching`] keeps every matching entry, in catalog order.
//!
//! Both fold every failed evaluation into a [`ClosestMiss`], returned with the
//! outcome and also retained on the catalog until the next search
//! ([`Database::closest_match_report`]).
//!
//! The criteria factories derive the search parameters for a given observation
//! from the catalog configuration.
use tracing::debug;

use crate::{
    caldb_errors::{CalDbError, ResultExt},
    calibrator_type::CalibratorType,
    database::{
        criteria::{Checks, ClosestMiss, Criteria, Sequence},
        entry::Entry,
        Database,
    },
    observations::{ObsType, Observation},
};

/// Result of [`Database::best_match`]
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Entry),
    NotFound(ClosestMiss),
}

impl SearchOutcome {
    pub fn found(self) -> Option<Entry> {
        match self {
            SearchOutcome::Found(entry) => Some(entry),
            SearchOutcome::NotFound(_) => None,
        }
    }

    /// Convert to a `Result`, carrying the closest-miss report in [`CalDbError::NotFound`]
    pub fn into_result(self) -> Result<Entry, CalDbError> {
        match self {
            SearchOutcome::Found(entry) => Ok(entry),
            SearchOutcome::NotFound(miss) => Err(CalDbError::NotFound {
                report: miss.report(),
            }),
        }
    }
}

/// Result of [`Database::all_matching`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllMatches {
    pub entries: Vec<Entry>,
    pub closest: ClosestMiss,
}

impl Database {
    fn remember_closest(&self, miss: &ClosestMiss) {
        *self.closest_slot() = miss.clone();
    }

    /// Entry matching `criteria` that is closest in time to the target
    ///
    /// Among equally close matches, the first in catalog order wins.
    pub fn best_match(&self, criteria: &Criteria) -> SearchOutcome {
        debug!("best_match over {} entries", self.entries.len());

        let mut miss = ClosestMiss::default();
        let mut best: Option<&Entry> = None;

        for entry in &self.entries {
            let report = criteria.evaluate(entry);
            if report.matched {
                best = Some(match best {
                    Some(current) => criteria.best(entry, current),
                    None => entry,
                });
            } else {
                miss.record(report);
            }
        }

        self.remember_closest(&miss);
        match best {
            Some(entry) => SearchOutcome::Found(entry.clone()),
            None => SearchOutcome::NotFound(miss),
        }
    }

    /// Every entry matching `criteria`, in catalog order
    ///
    /// An empty result is not an error.
    pub fn all_matching(&self, criteria: &Criteria) -> AllMatches {
        debug!("all_matching over {} entries", self.entries.len());

        let mut result = AllMatches::default();
        for entry in &self.entries {
            let report = criteria.evaluate(entry);
            if report.matched {
                result.entries.push(entry.clone());
            } else {
                result.closest.record(report);
            }
        }

        self.remember_closest(&result.closest);
        result
    }

    /// Criteria for a raw observation of the given type
    ///
    /// Flux calibrator observations are searched over the long time scale,
    /// ignoring position and instrument, in any time order; everything else over
    /// the short time scale. Without an observation only the type is compared.
    pub fn criteria_for_source(
        &self,
        obs: Option<&Observation>,
        obs_type: ObsType,
    ) -> Result<Criteria, CalDbError> {
        let mut criteria = Criteria::new(Entry::for_type(obs_type, None), &self.params);

        if matches!(obs_type, ObsType::FluxCalOn | ObsType::FluxCalOff) {
            criteria.minutes_apart = self.params.long_time_scale;
            criteria.checks.coordinates = false;
            criteria.checks.instrument = false;
            criteria.sequence = Sequence::Any;
        } else {
            criteria.minutes_apart = self.params.short_time_scale;
        }

        match obs {
            Some(obs) => {
                criteria.entry =
                    Entry::from_observation(obs).context("Database::criteria_for_source")?
            }
            None => criteria.checks = Checks::type_only(),
        }
        criteria.entry.obs_type = obs_type;
        criteria.entry.cal_type = None;

        Ok(criteria)
    }

    /// Criteria for a processed calibrator of the given subtype
    ///
    /// Flux and complete-Jones solutions are searched over the long time scale,
    /// ignoring position and instrument, in any time order; other subtypes over
    /// the short time scale.
    pub fn criteria_for_type(
        &self,
        obs: Option<&Observation>,
        cal_type: CalibratorType,
    ) -> Result<Criteria, CalDbError> {
        let mut criteria = Criteria::new(Entry::for_type(ObsType::Calibrator, None), &self.params);

        if cal_type.is_a(CalibratorType::Flux) || cal_type.is_a(CalibratorType::CompleteJones) {
            criteria.minutes_apart = self.params.long_time_scale;
            criteria.checks.coordinates = false;
            criteria.checks.instrument = false;
            criteria.sequence = Sequence::Any;
        } else {
            criteria.minutes_apart = self.params.short_time_scale;
        }

        match obs {
            Some(obs) => {
                criteria.entry =
                    Entry::from_observation(obs).context("Database::criteria_for_type")?
            }
            None => criteria.checks = Checks::type_only(),
        }
        criteria.entry.obs_type = ObsType::Calibrator;
        criteria.entry.cal_type = Some(cal_type);

        Ok(criteria)
    }
}
