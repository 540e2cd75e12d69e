//! # Calibrator database
//!
//! A [`Database`] is an ordered catalog of [`Entry`] records describing
//! calibration (and science) observations, plus the machinery to find the
//! calibrator best suited to a given observation and to turn it into a
//! calibration model.
//!
//! ## Construction
//!
//! - [`Database::from_file`] reads a catalog summary file
//!   (see [`catalog_file`]),
//! - [`Database::from_directory`] scans a directory tree for files with the
//!   given extensions and loads each one,
//! - [`Database::from_files`] / [`Database::from_metafile`] load an explicit
//!   list of files.
//!
//! Observations are decoded by an
//! [`ObservationLoader`](crate::observations::ObservationLoader). A file that
//! cannot be loaded, or that lacks the metadata an entry needs, is logged and
//! skipped.
//!
//! ## Insertion
//!
//! Every entry goes through [`Database::add`], which rejects entries with a zero
//! epoch and collapses duplicates (see [`Entry`] equality), keeping the entry
//! whose file was modified last.
//!
//! ## Searching and synthesis
//!
//! - [`search`]: [`Database::best_match`], [`Database::all_matching`] and the
//!   criteria factories,
//! - [`generate`]: the flux, polarization and hybrid calibrator pipelines.
pub mod cache;
pub mod catalog_file;
pub mod criteria;
pub mod display;
pub mod entry;
pub mod generate;
pub mod search;

use std::{
    sync::{Mutex, MutexGuard},
    time::SystemTime,
};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    caldb_errors::{CalDbError, ResultExt},
    calibrators::{HybridCalibrator, PolnCalibrator},
    constants::FILENAME_SENTINEL,
    database::{cache::CalibratorCache, criteria::ClosestMiss, entry::Entry},
    observations::{extensions::FeedTransform, Observation, ObservationLoader},
    params::DatabaseParams,
    time::is_zero_epoch,
};

/// Catalog of calibrator observations
#[derive(Debug, Default)]
pub struct Database {
    entries: Vec<Entry>,
    path: Option<Utf8PathBuf>,
    params: DatabaseParams,
    feed: Option<FeedTransform>,
    closest: Mutex<ClosestMiss>,
    poln_cache: CalibratorCache<PolnCalibrator>,
    hybrid_cache: CalibratorCache<HybridCalibrator>,
}

fn has_extension(path: &Utf8Path, extensions: &[&str]) -> bool {
    path.extension().is_some_and(|ext| {
        extensions
            .iter()
            .map(|e| e.trim_start_matches('*').trim_start_matches('.'))
            .any(|e| e == ext)
    })
}

impl Database {
    /// Empty catalog without base path
    pub fn new(params: DatabaseParams) -> Self {
        Database {
            params,
            ..Default::default()
        }
    }

    /// Empty catalog whose relative filenames resolve against `path`
    pub fn with_path(path: impl Into<Utf8PathBuf>, params: DatabaseParams) -> Self {
        Database {
            path: Some(path.into()),
            params,
            ..Default::default()
        }
    }

    /// Read a catalog summary file
    ///
    /// Unparsable lines and entries with a zero epoch are logged and skipped;
    /// duplicates collapse as in [`Database::add`].
    pub fn from_file(filename: &Utf8Path, params: DatabaseParams) -> Result<Self, CalDbError> {
        let text = catalog_file::read_catalog(filename).context("Database::from_file")?;
        debug!(
            "{filename}: path={:?}, {} entries",
            text.path,
            text.entries.len()
        );

        let mut db = Database {
            path: text.path,
            params,
            ..Default::default()
        };
        for entry in text.entries {
            if let Err(e) = db.add(entry) {
                warn!("{filename}: {e}");
            }
        }
        Ok(db)
    }

    /// Write the catalog summary file
    pub fn unload(&self, filename: &Utf8Path) -> Result<(), CalDbError> {
        catalog_file::write_catalog(filename, self.path.as_deref(), &self.entries)
            .context("Database::unload")?;
        info!("{filename}: wrote {} entries", self.entries.len());
        Ok(())
    }

    /// Build a catalog from every file under `dir` with one of the given extensions
    ///
    /// Arguments
    /// -----------------
    /// * `dir`: root of the recursive scan, also the catalog base path
    /// * `extensions`: accepted extensions (`"cf"`, `".cf"` and `"*.cf"` are equivalent)
    /// * `loader`: decodes each file
    /// * `params`: configuration of the catalog
    ///
    /// Return
    /// ----------
    /// * the catalog, or an error if `dir` itself cannot be read
    pub fn from_directory<L>(
        dir: &Utf8Path,
        extensions: &[&str],
        loader: &L,
        params: DatabaseParams,
    ) -> Result<Self, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let mut files = Vec::new();
        for item in WalkDir::new(dir).follow_links(false).into_iter() {
            let item = match item {
                Ok(item) => item,
                Err(e) if e.depth() == 0 => {
                    return Err(CalDbError::from(e)).context("Database::from_directory")
                }
                Err(e) => {
                    warn!("Error accessing entry: {e}");
                    continue;
                }
            };
            if !item.file_type().is_file() {
                continue;
            }
            match Utf8PathBuf::from_path_buf(item.into_path()) {
                Ok(path) if has_extension(&path, extensions) => files.push(path),
                Ok(_) => {}
                Err(path) => warn!("skipping non UTF-8 path {}", path.display()),
            }
        }
        files.sort();
        debug!("{dir}: {} candidate files", files.len());

        Ok(Self::from_files(Some(dir), &files, loader, params))
    }

    /// Build a catalog from an explicit list of files
    ///
    /// The sentinel name `filename` is ignored.
    pub fn from_files<L>(
        path: Option<&Utf8Path>,
        files: &[Utf8PathBuf],
        loader: &L,
        params: DatabaseParams,
    ) -> Self
    where
        L: ObservationLoader + ?Sized,
    {
        let mut db = Database {
            path: path.map(Utf8Path::to_path_buf),
            params,
            ..Default::default()
        };
        let added = db.add_files(files, loader);
        debug!("constructed catalog with {added} of {} files", files.len());
        db
    }

    /// Build a catalog from a file holding one filename per line
    ///
    /// Only the first token of each line is used; blank lines and lines starting
    /// with `#` are skipped. Relative names resolve against `dir`, which becomes
    /// the catalog base path.
    pub fn from_metafile<L>(
        dir: &Utf8Path,
        metafile: &Utf8Path,
        loader: &L,
        params: DatabaseParams,
    ) -> Result<Self, CalDbError>
    where
        L: ObservationLoader + ?Sized,
    {
        let text = std::fs::read_to_string(metafile)
            .map_err(CalDbError::io(metafile))
            .context("Database::from_metafile")?;

        let files: Vec<Utf8PathBuf> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_whitespace().next())
            .filter(|name| *name != FILENAME_SENTINEL)
            .map(|name| dir.join(name))
            .collect();

        Ok(Self::from_files(Some(dir), &files, loader, params))
    }

    /// Load and insert each file, logging and skipping failures
    ///
    /// Return
    /// ----------
    /// * the number of files whose entry was inserted
    pub fn add_files<L>(&mut self, files: &[Utf8PathBuf], loader: &L) -> usize
    where
        L: ObservationLoader + ?Sized,
    {
        let mut added = 0;
        for file in files {
            if file.file_name() == Some(FILENAME_SENTINEL) {
                continue;
            }
            match loader.load(file).and_then(|obs| self.add_observation(&obs)) {
                Ok(()) => added += 1,
                Err(e) => warn!("skipping {file}: {e}"),
            }
        }
        added
    }

    /// Insert the entry describing a loaded observation
    pub fn add_observation(&mut self, obs: &Observation) -> Result<(), CalDbError> {
        let entry = Entry::from_observation(obs).context("Database::add_observation")?;
        self.add(entry).context("Database::add_observation")
    }

    /// Insert one entry
    ///
    /// Return
    /// ----------
    /// * [`CalDbError::InvalidParam`] if the entry epoch is zero, or if its
    ///   instrument or receiver name is empty or contains whitespace.
    ///
    /// When the catalog already holds a duplicate, only the entry whose file was
    /// modified last is kept.
    pub fn add(&mut self, mut entry: Entry) -> Result<(), CalDbError> {
        if is_zero_epoch(&entry.epoch) {
            return Err(CalDbError::InvalidParam(format!(
                "{} has epoch = 0 (MJD)",
                entry.filename
            )));
        }
        if let Some((field, name)) = entry.malformed_name() {
            return Err(CalDbError::InvalidParam(format!(
                "{} has {field} name '{name}', which is not a single token",
                entry.filename
            )));
        }

        self.shorten_filename(&mut entry);

        if let Some(index) = self.entries.iter().position(|e| *e == entry) {
            let existing = &self.entries[index];
            warn!(
                "keeping newest of duplicate entries: {} and {}",
                existing.filename, entry.filename
            );
            if self.modified(&entry) > self.modified(existing) {
                self.entries[index] = entry;
            }
            return Ok(());
        }

        self.entries.push(entry);
        Ok(())
    }

    /// Insert every entry of another catalog
    pub fn merge(&mut self, other: &Database) -> Result<(), CalDbError> {
        for entry in &other.entries {
            let mut entry = entry.clone();
            // keep the name resolvable from this catalog
            entry.filename = other.get_filename(&entry);
            entry.path = None;
            self.add(entry).context("Database::merge")?;
        }
        Ok(())
    }

    /// Make the entry filename relative to the catalog base path and stamp the path
    pub fn shorten_filename(&self, entry: &mut Entry) {
        let Some(base) = &self.path else {
            return;
        };
        if let Ok(relative) = entry.filename.strip_prefix(base) {
            entry.filename = relative.to_path_buf();
        }
        entry.path = Some(base.clone());
    }

    /// Full file name of an entry
    pub fn get_filename(&self, entry: &Entry) -> Utf8PathBuf {
        if entry.filename.is_absolute() {
            return entry.filename.clone();
        }
        match entry.path.as_ref().or(self.path.as_ref()) {
            Some(base) => base.join(&entry.filename),
            None => entry.filename.clone(),
        }
    }

    fn modified(&self, entry: &Entry) -> Option<SystemTime> {
        std::fs::metadata(self.get_filename(entry))
            .and_then(|m| m.modified())
            .ok()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    pub fn params(&self) -> &DatabaseParams {
        &self.params
    }

    /// Sort entries by instrument, receiver, frequency, bandwidth and epoch
    pub fn sort(&mut self) {
        self.entries.sort_by(Entry::catalog_cmp);
    }

    /// Feed transformation attached to every polarization calibrator loaded
    pub fn set_feed(&mut self, feed: Option<FeedTransform>) {
        self.feed = feed;
    }

    pub fn feed(&self) -> Option<&FeedTransform> {
        self.feed.as_ref()
    }

    fn closest_slot(&self) -> MutexGuard<'_, ClosestMiss> {
        self.closest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Diagnostic of the closest miss of the last search
    pub fn closest_match_report(&self) -> String {
        self.closest_slot().report()
    }
}
