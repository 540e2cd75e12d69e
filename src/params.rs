//! # Catalog configuration
//!
//! This module defines the [`DatabaseParams`] configuration struct and its
//! builder. One immutable value is handed to a
//! [`Database`](crate::database::Database) at construction and copied into
//! every [`Criteria`](crate::database::criteria::Criteria) it builds; nothing is
//! read from process-wide state.
//!
//! ## Parameters
//!
//! | name                              | default  | unit    | used by                                        |
//! |-----------------------------------|----------|---------|------------------------------------------------|
//! | `long_time_scale`                 | 40320    | minutes | flux and complete-Jones searches               |
//! | `short_time_scale`                | 120      | minutes | every other search                             |
//! | `max_angular_separation`          | 5        | degrees | position comparator                            |
//! | `max_centre_frequency_difference` | 1        | Hz      | frequency comparator                           |
//! | `max_bandwidth_difference`        | 1        | Hz      | bandwidth comparator                           |
//! | `cache_last_cal`                  | true     |         | polarization and hybrid pipelines              |
//! | `match_verbose`                   | false    |         | log every evaluation at debug level            |
//! | `default_checks`                  | all on except channel layout | | new criteria                      |
//! | `default_sequence`                | `any`    |         | new criteria                                   |
//!
//! ## Example
//!
//! ```rust
//! use caldb::params::DatabaseParams;
//!
//! let params = DatabaseParams::builder()
//!     .short_time_scale(60.0)
//!     .max_angular_separation(1.0)
//!     .build()
//!     .unwrap();
//!
//! let from_file = DatabaseParams::from_toml_str(
//!     r#"
//!     short_time_scale = 60.0
//!     max_angular_separation = 1.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(params, from_file);
//! ```
use std::{
    cmp::Ordering::{Equal, Greater},
    fmt,
};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::{
    caldb_errors::CalDbError,
    constants::{Degree, Hz, Minute},
    database::criteria::{Checks, Sequence},
};

/// Tunable tolerances and behaviour switches of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseParams {
    /// Time window for flux and complete-Jones calibrators (minutes)
    pub long_time_scale: Minute,
    /// Time window for every other calibrator (minutes)
    pub short_time_scale: Minute,
    /// Maximum angular separation between calibrator and target (degrees)
    pub max_angular_separation: Degree,
    /// Maximum centre frequency difference (Hz)
    pub max_centre_frequency_difference: Hz,
    /// Maximum bandwidth difference (Hz)
    pub max_bandwidth_difference: Hz,
    /// Remember the last polarization and hybrid calibrators built
    ///
    /// The cache is keyed only by the selected catalog entry: a later request
    /// for another subtype or channel layout that selects the same entry gets
    /// the earlier model back.
    pub cache_last_cal: bool,
    pub match_verbose: bool,
    pub default_checks: Checks,
    pub default_sequence: Sequence,
}

impl DatabaseParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DatabaseParamsBuilder {
        DatabaseParamsBuilder::new()
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys take their default value.
    pub fn from_toml_str(text: &str) -> Result<Self, CalDbError> {
        let params: DatabaseParams =
            toml::from_str(text).map_err(|e| CalDbError::InvalidConfig(e.to_string()))?;
        DatabaseParamsBuilder { params }.build()
    }

    pub fn from_toml_file(path: &Utf8Path) -> Result<Self, CalDbError> {
        let text = std::fs::read_to_string(path).map_err(CalDbError::io(path))?;
        Self::from_toml_str(&text)
    }
}

impl Default for DatabaseParams {
    fn default() -> Self {
        DatabaseParams {
            long_time_scale: 40320.0, // four weeks
            short_time_scale: 120.0,
            max_angular_separation: 5.0,
            max_centre_frequency_difference: 1.0,
            max_bandwidth_difference: 1.0,
            cache_last_cal: true,
            match_verbose: false,
            default_checks: Checks::default(),
            default_sequence: Sequence::Any,
        }
    }
}

/// Builder for [`DatabaseParams`], with validation.
#[derive(Debug, Clone)]
pub struct DatabaseParamsBuilder {
    params: DatabaseParams,
}

impl Default for DatabaseParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: DatabaseParams::default(),
        }
    }

    // --- Time and position windows ---
    pub fn long_time_scale(mut self, v: Minute) -> Self {
        self.params.long_time_scale = v;
        self
    }
    pub fn short_time_scale(mut self, v: Minute) -> Self {
        self.params.short_time_scale = v;
        self
    }
    pub fn max_angular_separation(mut self, v: Degree) -> Self {
        self.params.max_angular_separation = v;
        self
    }

    // --- Frequency tolerances ---
    pub fn max_centre_frequency_difference(mut self, v: Hz) -> Self {
        self.params.max_centre_frequency_difference = v;
        self
    }
    pub fn max_bandwidth_difference(mut self, v: Hz) -> Self {
        self.params.max_bandwidth_difference = v;
        self
    }

    // --- Behaviour ---
    pub fn cache_last_cal(mut self, v: bool) -> Self {
        self.params.cache_last_cal = v;
        self
    }
    pub fn match_verbose(mut self, v: bool) -> Self {
        self.params.match_verbose = v;
        self
    }
    pub fn default_checks(mut self, v: Checks) -> Self {
        self.params.default_checks = v;
        self
    }
    pub fn default_sequence(mut self, v: Sequence) -> Self {
        self.params.default_sequence = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder and produce a [`DatabaseParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * time windows and the angular separation must be `≥ 0` (zero means unconstrained),
    /// * frequency and bandwidth tolerances must be `> 0`.
    ///
    /// Return
    /// ----------
    /// * `Ok(DatabaseParams)` if all values are valid.
    /// * `Err(CalDbError::InvalidParam)` naming the first offending parameter.
    pub fn build(self) -> Result<DatabaseParams, CalDbError> {
        let p = &self.params;

        if !Self::ge0(p.long_time_scale) || !Self::ge0(p.short_time_scale) {
            return Err(CalDbError::InvalidParam(
                "time scales must be non-negative".into(),
            ));
        }
        if !Self::ge0(p.max_angular_separation) {
            return Err(CalDbError::InvalidParam(
                "max_angular_separation must be non-negative".into(),
            ));
        }
        if !Self::gt0(p.max_centre_frequency_difference) {
            return Err(CalDbError::InvalidParam(
                "max_centre_frequency_difference must be > 0".into(),
            ));
        }
        if !Self::gt0(p.max_bandwidth_difference) {
            return Err(CalDbError::InvalidParam(
                "max_bandwidth_difference must be > 0".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for DatabaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PARAM_COL: usize = 44;

        macro_rules! line {
            ($fmt:expr, $val:expr, $comment:expr) => {{
                let s = format!($fmt, $val);
                let pad = " ".repeat(PARAM_COL.saturating_sub(s.len()).max(1));
                writeln!(f, "  {}{}# {}", s, pad, $comment)
            }};
        }

        writeln!(f, "Calibrator Database Parameters")?;
        writeln!(f, "------------------------------")?;
        line!(
            "long_time_scale  = {} min",
            self.long_time_scale,
            "Flux / complete-Jones time window"
        )?;
        line!(
            "short_time_scale = {} min",
            self.short_time_scale,
            "Reference calibrator time window"
        )?;
        line!(
            "max_angular_separation = {} deg",
            self.max_angular_separation,
            "Position tolerance"
        )?;
        line!(
            "max_centre_frequency_difference = {} Hz",
            self.max_centre_frequency_difference,
            "Frequency tolerance"
        )?;
        line!(
            "max_bandwidth_difference = {} Hz",
            self.max_bandwidth_difference,
            "Bandwidth tolerance"
        )?;
        line!(
            "cache_last_cal   = {}",
            self.cache_last_cal,
            "Remember the last calibrator"
        )?;
        line!(
            "default_sequence = {}",
            self.default_sequence,
            "Calibrator/target time ordering"
        )
    }
}
