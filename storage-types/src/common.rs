//! Common utility types shared across models

use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// One mebibyte. Request sizes are expressed in MiB.
pub const MIB: u64 = 1024 * 1024;

/// One tebibyte.
pub const TIB: u64 = 1024 * 1024 * 1024 * 1024;

/// GPT alignment boundary (1 MiB) - standard for modern disks
pub const GPT_ALIGNMENT_BYTES: u64 = MIB;

/// Fresh `msdos` tables are upgraded to `gpt` on devices larger than this.
pub const LEGACY_LABEL_LIMIT_BYTES: u64 = TIB;

/// Convert a size in MiB to whole sectors on a disk with the given sector size.
///
/// Integer division: a fractional trailing sector is truncated, never rounded
/// up, so the result never exceeds the requested byte count.
pub fn mib_to_sectors(mib: u64, sector_size: u64) -> u64 {
    if sector_size == 0 {
        return 0;
    }
    mib.saturating_mul(MIB) / sector_size
}

/// Convert a sector count to bytes.
pub fn sectors_to_bytes(sectors: u64, sector_size: u64) -> u64 {
    sectors.saturating_mul(sector_size)
}

/// An inclusive sector range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRange {
    /// First sector (inclusive)
    pub start: u64,

    /// Last sector (inclusive)
    pub end: u64,
}

impl SectorRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Check whether a sector lies inside this range
    pub fn contains(&self, sector: u64) -> bool {
        sector >= self.start && sector <= self.end
    }

    /// Number of sectors covered (0 for an inverted range)
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Format utilities for converting between bytes and human-readable strings
/// Convert bytes to human-readable format (e.g., "1.50 GB")
pub fn bytes_to_pretty(bytes: &u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val: f64 = *bytes as f64;

    while val > 1024. && steps <= 8 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KB",
        2 => "MB",
        3 => "GB",
        4 => "TB",
        5 => "PB",
        6 => "EB",
        7 => "ZB",
        8 => "YB",
        _ => "Not Supported",
    };

    if add_bytes {
        let bytes_str = bytes.to_formatted_string(&Locale::en);
        format!("{:.2} {} ({} bytes)", val, unit, bytes_str)
    } else {
        format!("{:.2} {}", val, unit)
    }
}
