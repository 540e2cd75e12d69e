//! # Catalog summary files
//!
//! Text persistence of a catalog:
//!
//! ```text
//! Pulsar::Database::path /data/calibrators
//! Pulsar::Database # of entries = 2
//! cal/a.cf SingleAxis 10:22:57.9960 +10:01:52.760 55089.235096018510000 -64 1369 256 PDFB3 MULTI
//! cal/b.fcal Flux 10:22:57.9960 +10:01:52.760 55090.000000000000000 -64 1369 256 PDFB3 MULTI
//! ```
//!
//! The first line carries the base path (`unset` when none), the second the
//! number of entries; every following line is one [`Entry`]. Files written with
//! the older `Pulsar::Calibration::Database` prefix are still read.
//!
//! Unparsable entry lines are logged and skipped. The entry count is only
//! informational.
use std::fmt::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    caldb_errors::CalDbError,
    constants::{CATALOG_PREFIX, LEGACY_CATALOG_PREFIX, UNSET_PATH},
    database::entry::Entry,
};

static PATH_HEADER: OnceCell<Regex> = OnceCell::new();
static COUNT_HEADER: OnceCell<Regex> = OnceCell::new();

fn header_pattern(
    cell: &'static OnceCell<Regex>,
    pattern: &str,
) -> Result<&'static Regex, CalDbError> {
    cell.get_or_try_init(|| Regex::new(pattern))
        .map_err(|e| CalDbError::InvalidState(format!("catalog header pattern: {e}")))
}

/// Content of one catalog summary file
#[derive(Debug, Clone)]
pub struct CatalogText {
    /// Base path recorded in the header
    pub path: Option<Utf8PathBuf>,
    /// Number of entries announced by the header
    pub declared: Option<usize>,
    /// Entries that parsed, in file order
    pub entries: Vec<Entry>,
    /// True when the header used the older prefix
    pub legacy: bool,
}

/// Parse the text of a catalog summary file
///
/// Arguments
/// -----------------
/// * `text`: the whole file content
/// * `source`: the file name, for diagnostics
///
/// Return
/// ----------
/// * the parsed catalog, or [`CalDbError::NotACatalog`] if the first line is not
///   a catalog path header
pub fn parse_catalog(text: &str, source: &Utf8Path) -> Result<CatalogText, CalDbError> {
    let path_re = header_pattern(
        &PATH_HEADER,
        r"^Pulsar::(Calibration::)?Database::path\s+(\S+)\s*$",
    )?;
    let count_re = header_pattern(
        &COUNT_HEADER,
        r"^Pulsar::(?:Calibration::)?Database\s+# of entries\s*=\s*(\d+)\s*$",
    )?;

    let mut lines = text.lines().enumerate().peekable();

    let captures = lines
        .next()
        .and_then(|(_, line)| path_re.captures(line.trim_end()))
        .ok_or_else(|| CalDbError::NotACatalog(source.to_string()))?;

    let legacy = captures.get(1).is_some();
    if legacy {
        info!("{source}: old {LEGACY_CATALOG_PREFIX} summary file");
    }

    let path = captures
        .get(2)
        .map(|m| m.as_str())
        .filter(|p| *p != UNSET_PATH)
        .map(Utf8PathBuf::from);

    let declared = match lines.peek() {
        Some((_, line)) => count_re
            .captures(line.trim_end())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok()),
        None => None,
    };
    if declared.is_some() {
        lines.next();
    }

    let mut entries = Vec::new();
    for (index, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Entry>() {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("{source}:{}: skipping entry: {e}", index + 1),
        }
    }

    if let Some(count) = declared {
        if count != entries.len() {
            warn!(
                "{source}: header announces {count} entries, {} were read",
                entries.len()
            );
        }
    }

    Ok(CatalogText {
        path,
        declared,
        entries,
        legacy,
    })
}

/// Render a catalog summary file
pub fn render_catalog(path: Option<&Utf8Path>, entries: &[Entry]) -> String {
    let mut out = String::new();
    let path = path.map_or(UNSET_PATH, |p| p.as_str());
    // writing to a String cannot fail
    let _ = writeln!(out, "{CATALOG_PREFIX}::path {path}");
    let _ = writeln!(out, "{CATALOG_PREFIX} # of entries = {}", entries.len());
    for entry in entries {
        let _ = writeln!(out, "{entry}");
    }
    out
}

/// Read and parse a catalog summary file
pub fn read_catalog(filename: &Utf8Path) -> Result<CatalogText, CalDbError> {
    let text = std::fs::read_to_string(filename).map_err(CalDbError::io(filename))?;
    parse_catalog(&text, filename)
}

/// Write a catalog summary file, replacing any previous content
pub fn write_catalog(
    filename: &Utf8Path,
    path: Option<&Utf8Path>,
    entries: &[Entry],
) -> Result<(), CalDbError> {
    std::fs::write(filename, render_catalog(path, entries)).map_err(CalDbError::io(filename))
}
