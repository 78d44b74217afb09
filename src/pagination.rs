use crate::filter::number;

pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Largest offset SQLite accepts as a bound integer.
const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    /// Builds a page request from raw query values.
    ///
    /// Missing, unparseable or non-positive pages become page 1; the size is
    /// clamped to `1..=MAX_PAGE_SIZE`.
    pub fn from_raw(page: Option<&str>, page_size: Option<&str>) -> Self {
        let page = number(page).filter(|p| *p >= 1).map_or(1, |p| p as u64);
        let page_size = number(page_size)
            .map_or(DEFAULT_PAGE_SIZE, |s| s.clamp(1, MAX_PAGE_SIZE as i64) as u64);
        Self { page, page_size }
    }

    /// Rows to skip. Pages past the end of any table clamp to the largest
    /// representable offset, which yields an empty page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size).min(MAX_OFFSET)
    }
}

/// Clamps a sample size for `/movies/random`.
pub fn sample_size(raw: Option<&str>, default: u64) -> u64 {
    number(raw).map_or(default, |n| n.clamp(1, MAX_PAGE_SIZE as i64) as u64)
}
