//! File statistics value object.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// File count and byte total, either for one folder's direct files or
/// aggregated over a subtree. Also used as a signed delta.
///
/// The operators saturate at the `i64` bounds. Writes that must reject an
/// overflow use [`checked_add`](Self::checked_add) and
/// [`checked_sub`](Self::checked_sub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileStats {
    /// Number of files.
    pub file_count: i64,
    /// Total size in bytes.
    pub total_size: i64,
}

impl FileStats {
    /// No files, no bytes.
    pub const ZERO: FileStats = FileStats {
        file_count: 0,
        total_size: 0,
    };

    /// Create a new stats value.
    pub fn new(file_count: i64, total_size: i64) -> Self {
        Self {
            file_count,
            total_size,
        }
    }

    /// Whether both components are zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Whether either component is negative.
    pub fn is_negative(&self) -> bool {
        self.file_count < 0 || self.total_size < 0
    }

    /// Component-wise addition, `None` if either component overflows.
    pub fn checked_add(self, rhs: FileStats) -> Option<FileStats> {
        Some(FileStats::new(
            self.file_count.checked_add(rhs.file_count)?,
            self.total_size.checked_add(rhs.total_size)?,
        ))
    }

    /// Component-wise subtraction, `None` if either component overflows.
    pub fn checked_sub(self, rhs: FileStats) -> Option<FileStats> {
        Some(FileStats::new(
            self.file_count.checked_sub(rhs.file_count)?,
            self.total_size.checked_sub(rhs.total_size)?,
        ))
    }
}

impl Add for FileStats {
    type Output = FileStats;

    fn add(self, rhs: FileStats) -> FileStats {
        FileStats::new(
            self.file_count.saturating_add(rhs.file_count),
            self.total_size.saturating_add(rhs.total_size),
        )
    }
}

impl AddAssign for FileStats {
    fn add_assign(&mut self, rhs: FileStats) {
        *self = *self + rhs;
    }
}

impl Sub for FileStats {
    type Output = FileStats;

    fn sub(self, rhs: FileStats) -> FileStats {
        FileStats::new(
            self.file_count.saturating_sub(rhs.file_count),
            self.total_size.saturating_sub(rhs.total_size),
        )
    }
}

impl SubAssign for FileStats {
    fn sub_assign(&mut self, rhs: FileStats) {
        *self = *self - rhs;
    }
}

impl Neg for FileStats {
    type Output = FileStats;

    fn neg(self) -> FileStats {
        FileStats::new(self.file_count.saturating_neg(), self.total_size.saturating_neg())
    }
}

impl std::iter::Sum for FileStats {
    fn sum<I: Iterator<Item = FileStats>>(iter: I) -> FileStats {
        iter.fold(FileStats::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic_rejects_overflow() {
        let full = FileStats::new(1, i64::MAX);
        assert_eq!(full.checked_add(FileStats::new(1, 1)), None);
        assert_eq!(
            FileStats::new(i64::MIN, 0).checked_sub(FileStats::new(1, 0)),
            None
        );
        assert_eq!(
            FileStats::new(2, 20).checked_add(FileStats::new(-1, -5)),
            Some(FileStats::new(1, 15))
        );
        assert_eq!(
            FileStats::new(2, 20).checked_sub(FileStats::new(2, 20)),
            Some(FileStats::ZERO)
        );
    }

    #[test]
    fn test_operators_saturate() {
        let sum = FileStats::new(i64::MAX, 1) + FileStats::new(1, 1);
        assert_eq!(sum, FileStats::new(i64::MAX, 2));

        let diff = FileStats::new(i64::MIN, 0) - FileStats::new(1, 0);
        assert_eq!(diff.file_count, i64::MIN);

        assert_eq!(-FileStats::new(i64::MIN, 3), FileStats::new(i64::MAX, -3));

        let total: FileStats = [FileStats::new(1, 10), FileStats::new(2, 20)].into_iter().sum();
        assert_eq!(total, FileStats::new(3, 30));
    }
}
