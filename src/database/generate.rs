//! # Calibrator synthesis
//!
//! The three pipelines share one shape: derive search criteria from the
//! observation to calibrate, search the catalog, load the selected file(s),
//! align their channels with the observation, then build the model.
//!
//! ## Flux
//!
//! [`Database::generate_flux_calibrator`] looks for a processed flux solution.
//! If that fails at any stage and raw data are allowed, every matching
//! on-source and off-source flux calibrator observation is loaded instead; both
//! sets must be non-empty. When neither branch succeeds, the error lists the
//! processed failure and the outcome of both raw searches.
//!
//! ## Polarization
//!
//! [`Database::generate_poln_calibrator`]:
//!
//! 1. unless a complete-Jones model is requested, search for a raw reference
//!    signal observation (a hybrid request fails here when none is found);
//! 2. unless a hybrid model is requested, search for a processed solution of the
//!    requested subtype, and keep whichever of the two candidates is closer in
//!    time to the observation;
//! 3. a processed solution is returned as is, a raw observation becomes a
//!    reference calibrator (after the optional feed transformation), and a
//!    hybrid request continues with [`Database::generate_hybrid_calibrator`].
//!
//! ## Hybrid
//!
//! [`Database::generate_hybrid_calibrator`] requires a complete-Jones solution
//! and combines it with the reference calibrator given by the caller.
//!
//! ## Caching
//!
//! When [`DatabaseParams::cache_last_cal`](crate::params::DatabaseParams) is set,
//! the last polarization and the last hybrid model are remembered with the entry
//! they were built from. A later request resolving to an equal entry returns the
//! remembered model without loading anything, even if it asked for another
//! subtype or channel layout.
use std::{fmt::Write, sync::Arc};

use tracing::{debug, info};

use crate::{
    caldb_errors::{CalDbError, ResultExt},
    calibrator_type::CalibratorType,
    calibrators::{
        FluxCalibrator, HybridCalibrator, PolnCalibrator, ReferenceCalibrator, SolvedCalibrator,
    },
    channels::align::align_channels,
    database::{
        entry::Entry,
        search::{AllMatches, SearchOutcome},
        Database,
    },
    observations::{ObsType, Observation, ObservationLoader},
};

impl Database {
    /// Load the file of `entry` and align its channels with `obs`
    fn load_aligned<L>(
        &self,
        loader: &L,
        entry: &Entry,
        obs: &Observation,
        apply_feed: bool,
    ) -> Result<Observation, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let filename = self.get_filename(entry);
        debug!("loading calibrator {filename}");

        let mut cal = loader.load(&filename)?;
        align_channels(&mut cal, obs)?;

        if apply_feed {
            if let Some(feed) = &self.feed {
                cal.feed = Some(feed.clone());
            }
        }
        Ok(cal)
    }

    /// Flux calibrator for `obs`
    ///
    /// Arguments
    /// -----------------
    /// * `loader`: decodes calibrator files
    /// * `obs`: the observation to calibrate
    /// * `allow_raw`: fall back to raw on/off observations when no processed
    ///   solution can be used
    ///
    /// Return
    /// ----------
    /// * the model, or the error of the processed search when raw data are not
    ///   allowed
    /// * [`CalDbError::InvalidState`] when both branches fail; its message holds
    ///   the processed branch failure and the result of both raw searches
    pub fn generate_flux_calibrator<L>(
        &self,
        loader: &L,
        obs: &Observation,
        allow_raw: bool,
    ) -> Result<FluxCalibrator, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let processed = match self.processed_flux_calibrator(loader, obs) {
            Ok(flux) => return Ok(flux),
            Err(e) if allow_raw => e,
            Err(e) => return Err(e).context("Database::generate_flux_calibrator"),
        };

        debug!("no processed flux calibrator ({processed}), trying raw observations");
        let processed_report = match processed.root() {
            CalDbError::NotFound { report } => report.clone(),
            _ => format!("\t{processed}\n"),
        };
        self.raw_flux(loader, obs, Some(&processed_report))
            .context("Database::raw_flux_calibrator")
            .context("Database::generate_flux_calibrator")
    }

    fn processed_flux_calibrator<L>(
        &self,
        loader: &L,
        obs: &Observation,
    ) -> Result<FluxCalibrator, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let criteria = self.criteria_for_type(Some(obs), CalibratorType::Flux)?;
        let entry = self.best_match(&criteria).into_result()?;
        let solution = self.load_aligned(loader, &entry, obs, false)?;
        FluxCalibrator::processed(solution)
    }

    /// Flux calibrator built from every matching raw on/off observation
    ///
    /// Return
    /// ----------
    /// * [`CalDbError::InvalidState`] if no on-source or no off-source
    ///   observation matches; the message reports both searches
    pub fn raw_flux_calibrator<L>(
        &self,
        loader: &L,
        obs: &Observation,
    ) -> Result<FluxCalibrator, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        self.raw_flux(loader, obs, None).context("Database::raw_flux_calibrator")
    }

    fn raw_flux<L>(
        &self,
        loader: &L,
        obs: &Observation,
        processed_report: Option<&str>,
    ) -> Result<FluxCalibrator, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let on = self.all_matching(&self.criteria_for_source(Some(obs), ObsType::FluxCalOn)?);
        let off = self.all_matching(&self.criteria_for_source(Some(obs), ObsType::FluxCalOff)?);

        if on.entries.is_empty() || off.entries.is_empty() {
            return Err(CalDbError::InvalidState(flux_failure_report(
                processed_report,
                &on,
                &off,
            )));
        }

        let load_all = |entries: &[Entry]| {
            entries
                .iter()
                .map(|entry| self.load_aligned(loader, entry, obs, false))
                .collect::<Result<Vec<_>, _>>()
        };
        let on = load_all(&on.entries)?;
        let off = load_all(&off.entries)?;

        info!(
            "raw flux calibrator from {} on and {} off observations",
            on.len(),
            off.len()
        );
        FluxCalibrator::raw(on, off)
    }

    /// Polarization calibrator of the given subtype for `obs`
    ///
    /// See the module documentation for the search order. When neither a raw
    /// nor a processed candidate is found, the error carries the closest-miss
    /// report of both searches.
    pub fn generate_poln_calibrator<L>(
        &self,
        loader: &L,
        obs: &Observation,
        cal_type: CalibratorType,
    ) -> Result<Arc<PolnCalibrator>, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        self.poln_calibrator(loader, obs, cal_type)
            .context("Database::generate_poln_calibrator")
    }

    fn poln_calibrator<L>(
        &self,
        loader: &L,
        obs: &Observation,
        cal_type: CalibratorType,
    ) -> Result<Arc<PolnCalibrator>, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let hybrid = cal_type.is_a(CalibratorType::Hybrid);
        let mut candidate: Option<Entry> = None;
        let mut raw_report = String::from("\tnot searched\n");

        if !cal_type.is_a(CalibratorType::CompleteJones) {
            let criteria = self.criteria_for_source(Some(obs), ObsType::PolnCal)?;
            match self.best_match(&criteria) {
                SearchOutcome::Found(entry) => candidate = Some(entry),
                SearchOutcome::NotFound(miss) => {
                    debug!("no raw PolnCal match, closest:\n{}", miss.report());
                    if hybrid {
                        return Err(CalDbError::NotFound {
                            report: format!(
                                "{}\n\tHybrid Calibrator requires raw PolnCal observation",
                                miss.report()
                            ),
                        });
                    }
                    raw_report = miss.report();
                }
            }
        }

        if !hybrid {
            let criteria = self.criteria_for_type(Some(obs), cal_type)?;
            match self.best_match(&criteria) {
                SearchOutcome::Found(processed) => {
                    candidate = Some(match candidate {
                        Some(raw) => criteria.best(&raw, &processed).clone(),
                        None => processed,
                    });
                }
                SearchOutcome::NotFound(miss) => {
                    debug!("no {cal_type} match, closest:\n{}", miss.report());
                    if candidate.is_none() {
                        return Err(CalDbError::NotFound {
                            report: format!(
                                "neither raw nor processed calibrator archives found.\n\
                                 \n\tRAW -- closest match: \n\n{raw_report}\
                                 \n\tPROCESSED -- closest match: \n\n{}",
                                miss.report()
                            ),
                        });
                    }
                }
            }
        }

        let entry = candidate.ok_or_else(|| {
            CalDbError::InvalidState(format!("no {cal_type} calibrator candidate"))
        })?;

        if hybrid {
            let raw = self.load_aligned(loader, &entry, obs, true)?;
            let reference = ReferenceCalibrator::new(cal_type, raw)?;
            let model = self.generate_hybrid_calibrator(loader, reference, obs)?;
            return Ok(Arc::new(PolnCalibrator::Hybrid(model)));
        }

        let build = || -> Result<PolnCalibrator, CalDbError> {
            info!("constructing {cal_type} calibrator from {}", entry.filename);
            let cal = self.load_aligned(loader, &entry, obs, true)?;
            if entry.is_solved() {
                Ok(PolnCalibrator::Solved(SolvedCalibrator::new(cal)?))
            } else {
                Ok(PolnCalibrator::Reference(ReferenceCalibrator::new(
                    cal_type, cal,
                )?))
            }
        };

        if self.params.cache_last_cal {
            self.poln_cache.get_or_try_build(&entry, build)
        } else {
            build().map(Arc::new)
        }
    }

    /// Hybrid calibrator combining a complete-Jones solution with `reference`
    ///
    /// Return
    /// ----------
    /// * [`CalDbError::InvalidState`] if no complete-Jones solution matches `obs`
    pub fn generate_hybrid_calibrator<L>(
        &self,
        loader: &L,
        reference: ReferenceCalibrator,
        obs: &Observation,
    ) -> Result<Arc<HybridCalibrator>, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let criteria = self
            .criteria_for_type(Some(obs), CalibratorType::CompleteJones)
            .context("Database::generate_hybrid_calibrator")?;

        let entry = match self.best_match(&criteria) {
            SearchOutcome::Found(entry) => entry,
            SearchOutcome::NotFound(miss) => {
                return Err(CalDbError::InvalidState(format!(
                    "No complete parameterization (e.g. pcm output) found\n{}",
                    miss.report()
                )))
                .context("Database::generate_hybrid_calibrator")
            }
        };

        let build = || -> Result<HybridCalibrator, CalDbError> {
            let solution = self.load_aligned(loader, &entry, obs, false)?;
            HybridCalibrator::new(solution, reference)
        };

        let model = if self.params.cache_last_cal {
            self.hybrid_cache.get_or_try_build(&entry, build)
        } else {
            build().map(Arc::new)
        };
        model.context("Database::generate_hybrid_calibrator")
    }
}

/// Every flux branch tried, one after the other: the processed search (when it
/// ran) and both raw searches
fn flux_failure_report(processed: Option<&str>, on: &AllMatches, off: &AllMatches) -> String {
    let sides = [(ObsType::FluxCalOn, on), (ObsType::FluxCalOff, off)];
    let missing: Vec<&str> = sides
        .iter()
        .filter(|(_, found)| found.entries.is_empty())
        .map(|(source, _)| source.name())
        .collect();

    let mut report = format!(
        "no {} observations found to match observation\n",
        missing.join(" or ")
    );
    if let Some(processed) = processed {
        let _ = write!(report, "\n\tPROCESSED -- closest match: \n\n{processed}");
    }
    for (source, found) in sides {
        if found.entries.is_empty() {
            let _ = write!(
                report,
                "\n\tRAW {source} -- closest match: \n\n{}",
                found.closest.report()
            );
        } else {
            let _ = writeln!(
                report,
                "\n\tRAW {source} -- {} matching observations",
                found.entries.len()
            );
        }
    }
    report
}
