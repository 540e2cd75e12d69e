//! # Constants and type definitions for caldb
//!
//! This module centralizes the **unit aliases**, **matching thresholds** and
//! **catalog format tokens** shared by the catalog, the matching engine and the
//! calibrator pipelines.
//!
//! ## Overview
//!
//! - Unit aliases (degrees, minutes, MHz, Hz)
//! - Duplicate-detection thresholds used by [`Entry`](crate::database::entry::Entry) equality
//! - Channel matching tolerance (fraction of one target channel width)
//! - Text tokens of the persisted catalog header

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Frequency in megahertz (catalog and observation unit)
pub type MHz = f64;
/// Frequency in hertz (tolerance unit)
pub type Hz = f64;
/// Time interval in minutes
pub type Minute = f64;
/// Modified Julian Date (days)
pub type MJD = f64;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// MHz → Hz
pub const HZ_PER_MHZ: f64 = 1.0e6;

// -------------------------------------------------------------------------------------------------
// Matching thresholds
// -------------------------------------------------------------------------------------------------

/// Two entries closer than this in time (seconds) may be duplicates
pub const DUPLICATE_EPOCH_SECONDS: f64 = 10.0;

/// Two entries closer than this on the sky (degrees) may be duplicates
pub const DUPLICATE_SEPARATION_DEGREES: Degree = 0.1;

/// Channel frequencies match when closer than this fraction of one target channel width
pub const CHANNEL_MATCH_FRACTION: f64 = 0.01;

/// Epochs below this MJD are treated as unset
pub const ZERO_EPOCH_MJD: MJD = 1.0e-6;

// -------------------------------------------------------------------------------------------------
// Catalog text format
// -------------------------------------------------------------------------------------------------

/// Prefix of the two header lines of a catalog summary file
pub const CATALOG_PREFIX: &str = "Pulsar::Database";

/// Prefix written by older releases; still accepted on load
pub const LEGACY_CATALOG_PREFIX: &str = "Pulsar::Calibration::Database";

/// Placeholder written when the catalog has no base path
pub const UNSET_PATH: &str = "unset";

/// Header artifact sometimes present in file lists
pub const FILENAME_SENTINEL: &str = "filename";

/// Minimum number of whitespace-delimited tokens in one catalog line
/// (filename, type, RA, DEC, epoch, bandwidth, frequency, nchan, instrument, receiver)
pub const ENTRY_TOKENS: usize = 10;
