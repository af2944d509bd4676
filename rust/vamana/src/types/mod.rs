//! Core type definitions for the Vamana graph index.
//!
//! This module defines the fundamental types used throughout the library:
//! - `IdType`: Sequential node identifier assigned by the graph store
//! - `Category`: Attribute used by filtered and stitched construction
//! - `VectorElement`: Trait for vector element types (f32, f64, Float16, BFloat16)

mod float16;

pub use float16::{BFloat16, Float16};

use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Internal node identifier.
pub type IdType = u32;

/// Invalid/sentinel value for node IDs (e.g. an unset medoid).
pub const INVALID_ID: IdType = IdType::MAX;

/// Node category. Uncategorized nodes carry `None`.
pub type Category = u32;

/// Sentinel written in place of a missing category in the persisted format.
pub const NO_CATEGORY: i64 = -1;

/// Trait for types that can be used as vector elements.
///
/// Elements must be printable and parseable so that a graph can be
/// persisted in its textual format.
pub trait VectorElement:
    Copy + Clone + Debug + Display + FromStr + PartialEq + Send + Sync + 'static
{
    /// Convert to f32 for distance calculations.
    fn to_f32(self) -> f32;

    /// Create from f32.
    fn from_f32(v: f32) -> Self;

    /// Zero value.
    fn zero() -> Self;
}

impl VectorElement for f32 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }
}

impl VectorElement for f64 {
    #[inline(always)]
    fn to_f32(self) -> f32 {
        self as f32
    }

    #[inline(always)]
    fn from_f32(v: f32) -> Self {
        v as f64
    }

    #[inline(always)]
    fn zero() -> Self {
        0.0
    }
}
