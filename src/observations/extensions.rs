use hifitime::Epoch;
use nalgebra::{Complex, Matrix2, Vector4};

use crate::{calibrator_type::CalibratorType, constants::MHz};

/// Name of the backend (instrument) that recorded the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub name: String,
}

impl Backend {
    pub fn new(name: impl Into<String>) -> Self {
        Backend { name: name.into() }
    }
}

/// Name of the receiver (front end) that recorded the data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub name: String,
}

impl Receiver {
    pub fn new(name: impl Into<String>) -> Self {
        Receiver { name: name.into() }
    }
}

/// Solution stored in a processed calibrator file
///
/// One parameter vector per channel; a `None` slot marks a channel for which
/// no solution could be found.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratorExtension {
    pub cal_type: CalibratorType,
    pub epoch: Epoch,
    pub channel_frequencies: Vec<MHz>,
    pub parameters: Vec<Option<Vec<f64>>>,
}

impl CalibratorExtension {
    /// Solution with empty parameter slots for each of `channel_frequencies`
    pub fn new(cal_type: CalibratorType, epoch: Epoch, channel_frequencies: Vec<MHz>) -> Self {
        let parameters = vec![None; channel_frequencies.len()];
        CalibratorExtension {
            cal_type,
            epoch,
            channel_frequencies,
            parameters,
        }
    }
}

/// Stokes parameters of the reference source, one vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratorStokes {
    pub stokes: Vec<Vector4<f64>>,
}

/// Transformation of the feed, as a 2×2 complex Jones matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTransform {
    pub jones: Matrix2<Complex<f64>>,
}

impl FeedTransform {
    /// Feed rotated about the line of sight by `angle` radians
    pub fn rotation(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let re = |x: f64| Complex::new(x, 0.0);
        FeedTransform {
            jones: Matrix2::new(re(c), re(-s), re(s), re(c)),
        }
    }
}
