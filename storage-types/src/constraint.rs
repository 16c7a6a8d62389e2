//! Placement constraints
//!
//! A `Constraint` bounds where a new partition may start and end and how long
//! it may be. The solver produces one alongside each placement and the table
//! re-checks it when the partition is added.

use serde::{Deserialize, Serialize};

use crate::common::SectorRange;
use crate::partition::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Minimum length in sectors
    pub min_size: u64,

    /// Maximum length in sectors
    pub max_size: u64,

    /// Start sector must be a multiple of this
    pub start_align: u64,

    /// `end + 1` must be a multiple of this
    pub end_align: u64,

    /// Sectors the start may fall in
    pub start_range: SectorRange,

    /// Sectors the end may fall in
    pub end_range: SectorRange,
}

/// Why a geometry does not satisfy a constraint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error("constraint is unsatisfiable (max size {max} < min size {min})")]
    Unsatisfiable { min: u64, max: u64 },
    #[error("length {length} outside [{min}, {max}]")]
    Size { length: u64, min: u64, max: u64 },
    #[error("start {start} not aligned to {align}")]
    StartAlignment { start: u64, align: u64 },
    #[error("end {end} not aligned to {align}")]
    EndAlignment { end: u64, align: u64 },
    #[error("start {start} outside [{lo}, {hi}]", lo = .range.start, hi = .range.end)]
    StartRange { start: u64, range: SectorRange },
    #[error("end {end} outside [{lo}, {hi}]", lo = .range.start, hi = .range.end)]
    EndRange { end: u64, range: SectorRange },
}

impl Constraint {
    /// A constraint accepted only by exactly `geometry`.
    pub fn exact(geometry: Geometry) -> Self {
        Self {
            min_size: geometry.length,
            max_size: geometry.length,
            start_align: 1,
            end_align: 1,
            start_range: SectorRange::new(geometry.start, geometry.start),
            end_range: SectorRange::new(geometry.end, geometry.end),
        }
    }

    pub fn is_satisfiable(&self) -> bool {
        self.max_size >= self.min_size && !self.start_range.is_empty() && !self.end_range.is_empty()
    }

    pub fn check(&self, geometry: &Geometry) -> Result<(), ConstraintViolation> {
        if self.max_size < self.min_size {
            return Err(ConstraintViolation::Unsatisfiable {
                min: self.min_size,
                max: self.max_size,
            });
        }
        if geometry.length < self.min_size || geometry.length > self.max_size {
            return Err(ConstraintViolation::Size {
                length: geometry.length,
                min: self.min_size,
                max: self.max_size,
            });
        }
        if self.start_align > 1 && geometry.start % self.start_align != 0 {
            return Err(ConstraintViolation::StartAlignment {
                start: geometry.start,
                align: self.start_align,
            });
        }
        if self.end_align > 1 && (geometry.end + 1) % self.end_align != 0 {
            return Err(ConstraintViolation::EndAlignment {
                end: geometry.end,
                align: self.end_align,
            });
        }
        if !self.start_range.contains(geometry.start) {
            return Err(ConstraintViolation::StartRange {
                start: geometry.start,
                range: self.start_range,
            });
        }
        if !self.end_range.contains(geometry.end) {
            return Err(ConstraintViolation::EndRange {
                end: geometry.end,
                range: self.end_range,
            });
        }
        Ok(())
    }
}
