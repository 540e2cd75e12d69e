use camino::Utf8PathBuf;
use thiserror::Error;

use crate::constants::MHz;

/// Line-level parsing errors for catalog entries.
///
/// Variants
/// -----------------
/// * `MissingFields` – fewer whitespace-delimited tokens than an entry needs.
/// * `TrailingFields` – tokens left over after the receiver.
/// * `UnknownType` – the type token is neither an observation type nor a calibrator subtype.
/// * `InvalidCoordinates` – the RA/DEC tokens are not sexagesimal angles.
/// * `InvalidEpoch` – the epoch token is not a number of days.
/// * `InvalidNumber` – bandwidth, frequency or channel count failed to parse.
/// * `EmptyReceiver` – the receiver token is empty.
#[derive(Error, Debug, PartialEq)]
pub enum ParseEntryError {
    #[error("expected at least {expected} fields, found {found} in '{line}'")]
    MissingFields {
        expected: usize,
        found: usize,
        line: String,
    },
    #[error("expected {expected} fields, found {found} in '{line}'")]
    TrailingFields {
        expected: usize,
        found: usize,
        line: String,
    },
    #[error("unknown observation or calibrator type: {0}")]
    UnknownType(String),
    #[error("invalid sky coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("invalid epoch: {0}")]
    InvalidEpoch(String),
    #[error("invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("could not parse receiver from '{0}'")]
    EmptyReceiver(String),
}

#[derive(Error, Debug)]
pub enum CalDbError {
    #[error("Error while parsing catalog entry: {0}")]
    Parse(#[from] ParseEntryError),

    #[error("{0} is not a database file")]
    NotACatalog(String),

    #[error("Observation lacks required metadata: {0}")]
    MissingMetadata(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("no match found\n{report}")]
    NotFound { report: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(
        "Channels could not be made to match up (final calibrator nchan={calibrator_nchan}, target nchan={target_nchan})"
    )]
    StructuralMismatch {
        calibrator_nchan: usize,
        target_nchan: usize,
    },

    #[error("No channel within {tolerance} MHz of {frequency} MHz")]
    ChannelNotFound { frequency: MHz, tolerance: MHz },

    #[error("Unable to perform file operation on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{operation}: {inner}")]
    Context {
        operation: &'static str,
        inner: Box<CalDbError>,
    },
}

impl CalDbError {
    /// Build an [`CalDbError::Io`] closure for `map_err`, remembering the attempted path.
    pub(crate) fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> CalDbError {
        let path = path.into();
        move |source| CalDbError::Io { path, source }
    }

    /// Strip every [`CalDbError::Context`] layer and return the originating error.
    pub fn root(&self) -> &CalDbError {
        match self {
            CalDbError::Context { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Names of the operations this error unwound through, innermost first.
    pub fn operations(&self) -> Vec<&'static str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let CalDbError::Context { operation, inner } = current {
            chain.push(*operation);
            current = inner;
        }
        chain.reverse();
        chain
    }
}

/// Annotate a propagated error with the name of the operation it unwinds through.
pub trait ResultExt<T> {
    fn context(self, operation: &'static str) -> Result<T, CalDbError>;
}

impl<T, E: Into<CalDbError>> ResultExt<T> for Result<T, E> {
    fn context(self, operation: &'static str) -> Result<T, CalDbError> {
        self.map_err(|err| CalDbError::Context {
            operation,
            inner: Box::new(err.into()),
        })
    }
}

impl PartialEq for CalDbError {
    fn eq(&self, other: &Self) -> bool {
        use CalDbError::*;
        match (self, other) {
            (Parse(a), Parse(b)) => a == b,
            (NotACatalog(a), NotACatalog(b)) => a == b,
            (MissingMetadata(a), MissingMetadata(b)) => a == b,
            (InvalidParam(a), InvalidParam(b)) => a == b,
            (NotFound { report: a }, NotFound { report: b }) => a == b,
            (InvalidState(a), InvalidState(b)) => a == b,
            (
                StructuralMismatch {
                    calibrator_nchan: a1,
                    target_nchan: a2,
                },
                StructuralMismatch {
                    calibrator_nchan: b1,
                    target_nchan: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (
                ChannelNotFound {
                    frequency: a1,
                    tolerance: a2,
                },
                ChannelNotFound {
                    frequency: b1,
                    tolerance: b2,
                },
            ) => a1 == b1 && a2 == b2,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (
                Context {
                    operation: a1,
                    inner: a2,
                },
                Context {
                    operation: b1,
                    inner: b2,
                },
            ) => a1 == b1 && a2 == b2,

            // not comparable beyond the variant
            (Io { path: a, .. }, Io { path: b, .. }) => a == b,
            (WalkDir(_), WalkDir(_)) => true,

            _ => false,
        }
    }
}
