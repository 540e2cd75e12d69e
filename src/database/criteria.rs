//! # Matching criteria
//!
//! A [`Criteria`] holds the wanted parameters (a target [`Entry`]), per-field
//! enable flags ([`Checks`]), tolerances, and the time ordering mode
//! ([`Sequence`]). [`Criteria::evaluate`] tests one candidate entry and returns
//! a [`MatchReport`]: whether it matched, how many comparators it passed, the
//! last time/angle deltas and a human-readable diagnostic.
//!
//! ## Comparator order
//!
//! 1. observation type (plus calibrator subtype compatibility when the target is
//!    a processed calibrator),
//! 2. receiver,
//! 3. instrument,
//! 4. centre frequency,
//! 5. bandwidth,
//! 6. time,
//! 7. sky position,
//! 8. channel layout (off by default).
//!
//! Evaluation stops at the first failing comparator.
//!
//! ## Time window
//!
//! With `δ = candidate − target` in minutes and `W` the window:
//!
//! | [`Sequence`]                  | passes iff      |
//! |-------------------------------|-----------------|
//! | `Any`                         | `abs(δ) < W`    |
//! | `CalibratorAfter`             | `0 ≤ δ < W`     |
//! | `CalibratorBefore`            | `0 ≤ −δ < W`    |
//!
//! A zero window (or a zero angular tolerance) is unconstrained.
use std::{fmt, fmt::Write as _, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    caldb_errors::CalDbError,
    calibrator_type::{compatible, CalibratorType},
    channels::{subset_match, ChannelLayout},
    constants::{Degree, Hz, Minute, HZ_PER_MHZ},
    database::entry::Entry,
    observations::ObsType,
    params::DatabaseParams,
    time::minutes_between,
};

/// Required time ordering between calibrator and target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sequence {
    #[default]
    #[serde(rename = "any", alias = "none")]
    Any,
    /// The calibrator must precede the target
    #[serde(rename = "before")]
    CalibratorBefore,
    /// The calibrator must follow the target
    #[serde(rename = "after")]
    CalibratorAfter,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sequence::Any => "any",
            Sequence::CalibratorBefore => "before",
            Sequence::CalibratorAfter => "after",
        })
    }
}

impl FromStr for Sequence {
    type Err = CalDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "none" => Ok(Sequence::Any),
            "before" => Ok(Sequence::CalibratorBefore),
            "after" => Ok(Sequence::CalibratorAfter),
            _ => Err(CalDbError::InvalidParam(format!("unknown sequence '{s}'"))),
        }
    }
}

/// Per-field enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checks {
    pub receiver: bool,
    pub instrument: bool,
    pub frequency: bool,
    pub bandwidth: bool,
    pub obs_type: bool,
    pub time: bool,
    pub coordinates: bool,
    pub channel_layout: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Checks {
            receiver: true,
            instrument: true,
            frequency: true,
            bandwidth: true,
            obs_type: true,
            time: true,
            coordinates: true,
            channel_layout: false,
        }
    }
}

impl Checks {
    /// Only the observation type is compared
    pub fn type_only() -> Self {
        Checks {
            receiver: false,
            instrument: false,
            frequency: false,
            bandwidth: false,
            obs_type: true,
            time: false,
            coordinates: false,
            channel_layout: false,
        }
    }
}

/// Outcome of one candidate evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub matched: bool,
    /// One line per comparator that was run
    pub text: String,
    /// Number of comparators passed
    pub match_count: usize,
    /// Time delta as tested by the time comparator (minutes)
    pub diff_minutes: Minute,
    /// Angular separation as tested by the position comparator (degrees)
    pub diff_degrees: Degree,
}

impl MatchReport {
    fn check(&mut self, name: &str, detail: impl fmt::Display, passed: bool) -> bool {
        let verdict = if passed { "match" } else { "no match" };
        // writing to a String cannot fail
        let _ = writeln!(self.text, "\t{name} {detail} ... {verdict}");
        if passed {
            self.match_count += 1;
        }
        passed
    }

    /// True when this failed evaluation is more informative than `other`
    ///
    /// More comparators passed wins; then the smaller absolute time delta; then
    /// the longer report.
    pub fn closer_than(&self, other: &MatchReport) -> bool {
        if self.match_count != other.match_count {
            return self.match_count > other.match_count;
        }
        let (a, b) = (self.diff_minutes.abs(), other.diff_minutes.abs());
        if a != b {
            return a < b;
        }
        self.text.len() > other.text.len()
    }
}

/// The most informative failed evaluation of one catalog scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosestMiss {
    best: Option<MatchReport>,
}

impl ClosestMiss {
    pub fn record(&mut self, miss: MatchReport) {
        self.best = match self.best.take() {
            Some(current) => Some(Criteria::closest(current, miss)),
            None => Some(miss),
        };
    }

    pub fn best(&self) -> Option<&MatchReport> {
        self.best.as_ref()
    }

    /// Diagnostic text of the closest miss, `"\tempty\n"` when no miss passed any comparator
    pub fn report(&self) -> String {
        match &self.best {
            Some(best) if best.match_count > 0 => best.text.clone(),
            _ => "\tempty\n".to_string(),
        }
    }
}

fn cal_type_name(cal_type: Option<CalibratorType>) -> &'static str {
    cal_type.map_or("none", |t| t.name())
}

/// Target parameters, enable flags and tolerances of one search
#[derive(Debug, Clone)]
pub struct Criteria {
    pub entry: Entry,
    pub checks: Checks,
    /// Time window (minutes), zero for unconstrained
    pub minutes_apart: Minute,
    /// Maximum angular separation (degrees), zero for unconstrained
    pub degrees_apart: Degree,
    pub sequence: Sequence,
    pub max_frequency_difference: Hz,
    pub max_bandwidth_difference: Hz,
    /// Log every evaluation at debug level instead of trace
    pub verbose: bool,
}

impl Criteria {
    /// Criteria around `entry` with the default checks, the short time scale and
    /// the configured tolerances
    pub fn new(entry: Entry, params: &DatabaseParams) -> Self {
        Criteria {
            entry,
            checks: params.default_checks,
            minutes_apart: params.short_time_scale,
            degrees_apart: params.max_angular_separation,
            sequence: params.default_sequence,
            max_frequency_difference: params.max_centre_frequency_difference,
            max_bandwidth_difference: params.max_bandwidth_difference,
            verbose: params.match_verbose,
        }
    }

    /// Signed time delta after applying the sequence mode
    fn time_difference(&self, have: &Entry) -> Minute {
        let diff = minutes_between(&have.epoch, &self.entry.epoch);
        match self.sequence {
            Sequence::Any => diff.abs(),
            Sequence::CalibratorBefore => -diff,
            Sequence::CalibratorAfter => diff,
        }
    }

    fn run(&self, have: &Entry, report: &mut MatchReport) -> bool {
        let want = &self.entry;

        if self.checks.obs_type {
            let detail = format!("obsType want={} have={}", want.obs_type, have.obs_type);
            if !report.check("type", detail, want.obs_type == have.obs_type) {
                return false;
            }
            if want.obs_type == ObsType::Calibrator {
                let detail = format!(
                    "calType want={} have={}",
                    cal_type_name(want.cal_type),
                    cal_type_name(have.cal_type)
                );
                if !report.check("type", detail, compatible(want.cal_type, have.cal_type)) {
                    return false;
                }
            }
        }

        if self.checks.receiver {
            let detail = format!("want={} have={}", want.receiver, have.receiver);
            if !report.check("receiver", detail, want.receiver == have.receiver) {
                return false;
            }
        }

        if self.checks.instrument {
            let detail = format!("want={} have={}", want.instrument, have.instrument);
            if !report.check("instrument", detail, want.instrument == have.instrument) {
                return false;
            }
        }

        if self.checks.frequency {
            let diff = (want.frequency - have.frequency).abs() * HZ_PER_MHZ;
            let detail = format!("want={} have={} MHz", want.frequency, have.frequency);
            if !report.check("frequency", detail, diff < self.max_frequency_difference) {
                return false;
            }
        }

        if self.checks.bandwidth {
            let diff = (want.bandwidth - have.bandwidth).abs() * HZ_PER_MHZ;
            let detail = format!("want={} have={} MHz", want.bandwidth, have.bandwidth);
            if !report.check("bandwidth", detail, diff < self.max_bandwidth_difference) {
                return false;
            }
        }

        if self.checks.time {
            let diff = self.time_difference(have);
            report.diff_minutes = diff;
            let passed = self.minutes_apart == 0.0 || (0.0..self.minutes_apart).contains(&diff);
            let detail = format!(
                "difference={diff} minutes (max={}, sequence={})",
                self.minutes_apart, self.sequence
            );
            if !report.check("time", detail, passed) {
                return false;
            }
        }

        if self.checks.coordinates {
            let diff = have.position.angular_separation(&want.position);
            report.diff_degrees = diff;
            let passed = self.degrees_apart == 0.0 || diff < self.degrees_apart;
            let detail = format!("difference={diff} degrees (max={})", self.degrees_apart);
            if !report.check("position", detail, passed) {
                return false;
            }
        }

        if self.checks.channel_layout {
            let superset = ChannelLayout::from_entry(have);
            let subset = ChannelLayout::from_entry(want);
            let (passed, detail) = match subset_match(&superset, &subset) {
                Ok(()) => (true, String::new()),
                Err(reason) => (false, format!("({reason})")),
            };
            if !report.check("channel subset", detail, passed) {
                return false;
            }
        }

        true
    }

    /// Evaluate one candidate entry
    ///
    /// Arguments
    /// -----------------
    /// * `have`: the candidate catalog entry
    ///
    /// Return
    /// ----------
    /// * the report of this evaluation; [`MatchReport::matched`] is false as soon
    ///   as one enabled comparator fails
    pub fn evaluate(&self, have: &Entry) -> MatchReport {
        let mut report = MatchReport::default();
        report.matched = self.run(have, &mut report);

        let verdict = if report.matched { "found" } else { "not found" };
        if self.verbose {
            debug!("match {verdict} for {}\n{}", have.filename, report.text);
        } else {
            trace!("match {verdict} for {}\n{}", have.filename, report.text);
        }
        report
    }

    pub fn is_match(&self, have: &Entry) -> bool {
        self.evaluate(have).matched
    }

    /// The entry closer in time to the target epoch; `b` on a tie
    pub fn best<'a>(&self, a: &'a Entry, b: &'a Entry) -> &'a Entry {
        let da = minutes_between(&a.epoch, &self.entry.epoch).abs();
        let db = minutes_between(&b.epoch, &self.entry.epoch).abs();
        if da < db {
            a
        } else {
            b
        }
    }

    /// The more informative of two failed evaluations; see [`MatchReport::closer_than`]
    pub fn closest(a: MatchReport, b: MatchReport) -> MatchReport {
        if a.closer_than(&b) {
            a
        } else {
            b
        }
    }
}

#[cfg(test)]
mod criteria_test {
    use super::*;
    use crate::{sky::SkyCoord, time::epoch_from_mjd};
    use hifitime::Unit;

    fn target() -> Entry {
        Entry {
            filename: "target.ar".into(),
            path: None,
            obs_type: ObsType::PolnCal,
            cal_type: None,
            position: SkyCoord::new(150.0, -30.0),
            epoch: epoch_from_mjd(60000.0),
            bandwidth: 400.0,
            frequency: 1400.0,
            nchan: 16,
            instrument: "PDFB4".into(),
            receiver: "MULTI".into(),
        }
    }

    fn criteria() -> Criteria {
        Criteria::new(target(), &DatabaseParams::default())
    }

    fn shifted(minutes: f64) -> Entry {
        let mut e = target();
        e.filename = format!("cal_{minutes}.cf").into();
        e.epoch += Unit::Minute * minutes;
        e
    }

    #[test]
    fn test_exact_match() {
        let report = criteria().evaluate(&target());
        assert!(report.matched);
        assert_eq!(report.match_count, 7);
        assert!(report.text.contains("receiver want=MULTI have=MULTI ... match"));
    }

    #[test]
    fn test_short_circuit() {
        let mut cand = target();
        cand.receiver = "H-OH".into();
        cand.instrument = "other".into();
        let report = criteria().evaluate(&cand);
        assert!(!report.matched);
        assert_eq!(report.match_count, 1);
        assert!(report.text.contains("receiver want=MULTI have=H-OH ... no match"));
        assert!(!report.text.contains("instrument"));
    }

    #[test]
    fn test_time_direction() {
        let mut c = criteria();
        c.minutes_apart = 60.0;

        c.sequence = Sequence::Any;
        assert!(c.is_match(&shifted(-30.0)));
        assert!(c.is_match(&shifted(30.0)));
        assert!(!c.is_match(&shifted(61.0)));

        c.sequence = Sequence::CalibratorAfter;
        assert!(c.is_match(&shifted(30.0)));
        assert!(c.is_match(&shifted(0.0)));
        assert!(!c.is_match(&shifted(-30.0)));
        assert!(!c.is_match(&shifted(60.0)));

        c.sequence = Sequence::CalibratorBefore;
        assert!(c.is_match(&shifted(-30.0)));
        assert!(!c.is_match(&shifted(30.0)));

        c.minutes_apart = 0.0;
        assert!(c.is_match(&shifted(1.0e6)));
    }

    #[test]
    fn test_time_window_edges() {
        let mut c = criteria();
        c.minutes_apart = 60.0;

        c.sequence = Sequence::CalibratorBefore;
        assert!(c.is_match(&shifted(0.0)));
        assert!(c.is_match(&shifted(-59.0)));
        assert!(!c.is_match(&shifted(-60.0)));

        c.sequence = Sequence::Any;
        assert!(c.is_match(&shifted(0.0)));
        assert!(!c.is_match(&shifted(60.0)));
        assert!(!c.is_match(&shifted(-60.0)));

        let report = c.evaluate(&shifted(-60.0));
        assert!(report.text.contains("difference=60 minutes (max=60, sequence="));
        assert_eq!(report.diff_minutes, 60.0);
    }

    #[test]
    fn test_calibrator_subtype_compatibility() {
        let mut want = Entry::for_type(ObsType::Calibrator, Some(CalibratorType::CompleteJones));
        want.epoch = epoch_from_mjd(60000.0);
        let mut c = Criteria::new(want, &DatabaseParams::default());
        c.checks = Checks::type_only();

        let mut have = target();
        have.obs_type = ObsType::Calibrator;
        have.cal_type = Some(CalibratorType::Britton);
        assert!(c.is_match(&have));

        have.cal_type = Some(CalibratorType::SingleAxis);
        let report = c.evaluate(&have);
        assert!(!report.matched);
        assert!(report.text.contains("calType want=CompleteJones have=SingleAxis"));
    }

    #[test]
    fn test_frequency_tolerance_in_hz() {
        let mut c = criteria();
        let mut cand = target();
        cand.frequency = 1400.0 + 0.5e-6;
        assert!(c.is_match(&cand));

        cand.frequency = 1400.001;
        assert!(!c.is_match(&cand));

        c.max_frequency_difference = 1.0e4;
        assert!(c.is_match(&cand));
    }

    #[test]
    fn test_disabling_checks_is_monotonic() {
        let mut cand = shifted(500.0);
        cand.receiver = "other".into();
        cand.position = SkyCoord::new(170.0, -30.0);

        let mut c = criteria();
        assert!(!c.is_match(&cand));
        c.checks.receiver = false;
        assert!(!c.is_match(&cand));
        c.checks.time = false;
        assert!(!c.is_match(&cand));
        c.checks.coordinates = false;
        assert!(c.is_match(&cand));

        // every further relaxation keeps the pass
        c.checks.frequency = false;
        c.checks.instrument = false;
        assert!(c.is_match(&cand));
    }

    #[test]
    fn test_channel_layout_check() {
        let mut c = criteria();
        c.checks.channel_layout = true;
        c.entry.bandwidth = 300.0;
        c.entry.nchan = 12;
        c.checks.bandwidth = false;

        assert!(c.is_match(&target()));

        let mut coarse = target();
        coarse.nchan = 8;
        let report = c.evaluate(&coarse);
        assert!(!report.matched);
        assert!(report.text.contains("channel bandwidth mismatch"));
    }

    #[test]
    fn test_best_and_closest() {
        let c = criteria();
        let a = shifted(-20.0);
        let b = shifted(10.0);
        assert_eq!(c.best(&a, &b).filename, b.filename);
        assert_eq!(c.best(&b, &a).filename, b.filename);

        let mut tight = criteria();
        tight.minutes_apart = 5.0;
        let near = tight.evaluate(&shifted(20.0));
        let far = tight.evaluate(&shifted(400.0));
        assert_eq!(near.match_count, far.match_count);
        assert_eq!(Criteria::closest(far.clone(), near.clone()), near);

        let mut wrong_receiver = target();
        wrong_receiver.receiver = "other".into();
        let early = tight.evaluate(&wrong_receiver);
        assert_eq!(Criteria::closest(early, far.clone()), far);
    }

    #[test]
    fn test_closest_miss_report() {
        let mut miss = ClosestMiss::default();
        assert_eq!(miss.report(), "\tempty\n");

        let mut other = target();
        other.obs_type = ObsType::Pulsar;
        miss.record(criteria().evaluate(&other));
        assert_eq!(miss.report(), "\tempty\n");

        let mut c = criteria();
        c.minutes_apart = 1.0;
        let late = c.evaluate(&shifted(30.0));
        miss.record(late.clone());
        assert_eq!(miss.report(), late.text);
    }

    #[test]
    fn test_sequence_text() {
        assert_eq!("none".parse::<Sequence>().unwrap(), Sequence::Any);
        assert_eq!("Before".parse::<Sequence>().unwrap(), Sequence::CalibratorBefore);
        assert_eq!(Sequence::CalibratorAfter.to_string(), "after");
        assert!("sometime".parse::<Sequence>().is_err());
    }
}
