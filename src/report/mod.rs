//! Persisted run artifacts.

pub mod curve;

pub use curve::{CurvePoint, LossCurve};
