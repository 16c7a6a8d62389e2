// SPDX-License-Identifier: GPL-3.0-only

//! Constraint solving
//!
//! Turns a size request into a concrete placement on one disk. Requests
//! arrive in MiB and are converted once with the disk's own sector size;
//! everything below [`solve`] works in sectors.
//!
//! Exact sizes always take the first free region that fits. Minimum sizes
//! use the configured [`AllocationStrategy`]: `Largest` picks the region
//! leaving the most usable space, `FirstFit` the first one that qualifies.
//! In both cases the new partition starts at the region's aligned start and
//! the free-space reserve is kept at the region's tail.

use storage_types::{
    AllocationStrategy, Constraint, FreeRegion, Geometry, PartitionTable, SectorRange,
    SizeRequirement, mib_to_sectors,
};

use crate::free_space::free_regions;

/// Size demand in sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    /// Exactly this many sectors
    Exact(u64),
    /// More than this many sectors, as many as the region allows
    MoreThan(u64),
}

/// A placement and the constraint it was solved under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub geometry: Geometry,
    pub constraint: Constraint,
}

/// Place `size` on `table`, keeping `minfree_mib` free after it.
///
/// Returns `None` when no free region on this disk can hold the request.
pub fn solve(
    table: &PartitionTable,
    size: SizeRequirement,
    minfree_mib: u64,
    strategy: AllocationStrategy,
) -> Option<Region> {
    let sector_size = table.sector_size();
    let demand = match size {
        SizeRequirement::Exact(mib) => Demand::Exact(mib_to_sectors(mib, sector_size)),
        SizeRequirement::Minimum(mib) => Demand::MoreThan(mib_to_sectors(mib, sector_size)),
        SizeRequirement::Unbounded => Demand::MoreThan(0),
    };
    let reserve = mib_to_sectors(minfree_mib, sector_size);
    place(table, demand, reserve, strategy)
}

/// Sector-level placement behind [`solve`]
pub fn place(
    table: &PartitionTable,
    demand: Demand,
    reserve: u64,
    strategy: AllocationStrategy,
) -> Option<Region> {
    let grain = table.device.alignment_sectors.max(1);
    let candidates = free_regions(table)
        .into_iter()
        .filter_map(|region| Candidate::new(region, grain, reserve));

    match demand {
        Demand::Exact(sectors) => place_exact(candidates, sectors, grain),
        Demand::MoreThan(threshold) => match strategy {
            AllocationStrategy::Largest => place_largest(candidates, threshold, grain),
            AllocationStrategy::FirstFit => candidates
                .filter_map(|c| c.grow(threshold, grain))
                .next(),
        },
    }
}

/// Part of a free region a partition may occupy: aligned at the start, with
/// the reserve cut off the end.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: u64,
    available: u64,
}

impl Candidate {
    fn new(region: FreeRegion, grain: u64, reserve: u64) -> Option<Self> {
        let start = region.start.div_ceil(grain) * grain;
        if start > region.end {
            return None;
        }
        let span = region.end - start + 1;
        let available = span.checked_sub(reserve).filter(|a| *a > 0)?;
        tracing::trace!(
            "free region {}-{}: {} sectors usable from {}",
            region.start,
            region.end,
            available,
            start
        );
        Some(Self { start, available })
    }

    fn range(&self) -> SectorRange {
        SectorRange::new(self.start, self.start + self.available - 1)
    }

    /// Exactly `sectors`, or nothing when they do not fit
    fn fixed(&self, sectors: u64, grain: u64) -> Option<Region> {
        let constraint = Constraint {
            min_size: sectors,
            max_size: sectors.min(self.available),
            start_align: grain,
            end_align: 1,
            start_range: self.range(),
            end_range: self.range(),
        };
        if sectors == 0 || !constraint.is_satisfiable() {
            return None;
        }
        Some(Region {
            geometry: Geometry::new(self.start, sectors),
            constraint,
        })
    }

    /// As much of the candidate as possible, provided it is more than
    /// `threshold`. The end is rounded down to the grain when that still
    /// leaves enough.
    fn grow(&self, threshold: u64, grain: u64) -> Option<Region> {
        let aligned = self.available - self.available % grain;
        let (length, end_align) = if aligned > threshold {
            (aligned, grain)
        } else {
            (self.available, 1)
        };
        let constraint = Constraint {
            min_size: threshold.saturating_add(1),
            max_size: length,
            start_align: grain,
            end_align,
            start_range: self.range(),
            end_range: self.range(),
        };
        if !constraint.is_satisfiable() {
            return None;
        }
        Some(Region {
            geometry: Geometry::new(self.start, length),
            constraint,
        })
    }
}

fn place_exact(
    mut candidates: impl Iterator<Item = Candidate>,
    sectors: u64,
    grain: u64,
) -> Option<Region> {
    let region = candidates.find_map(|c| c.fixed(sectors, grain));
    if region.is_none() {
        tracing::debug!("no free region holds {} sectors", sectors);
    }
    region
}

fn place_largest(
    candidates: impl Iterator<Item = Candidate>,
    threshold: u64,
    grain: u64,
) -> Option<Region> {
    let mut best: Option<Region> = None;
    for region in candidates.filter_map(|c| c.grow(threshold, grain)) {
        // strictly larger: ties keep the earlier region
        if best.is_none_or(|b| region.geometry.length > b.geometry.length) {
            best = Some(region);
        }
    }
    if best.is_none() {
        tracing::debug!("no free region exceeds {} sectors", threshold);
    }
    best
}
