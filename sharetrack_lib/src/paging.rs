//! Sorting and pagination shared by the people listing and the leaderboard.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SharetrackError;

/// Page sizes offered by the listing views; the first is the default.
/// Any size in 1..=100 is accepted.
pub const PAGE_SIZE_CHOICES: &[i64] = &[10, 25, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(SharetrackError::InvalidInput(format!(
                "unknown sort direction '{}'. Valid values: asc, desc",
                s
            ))),
        }
    }
}

/// Current sort of a column-sortable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<C> {
    pub column: C,
    pub direction: SortDirection,
}

impl<C: Copy> SortState<C> {
    pub fn new(column: C, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// One page of results plus the total row count across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.page_size)
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Zero-based inclusive row range for a 1-based page, as used by range queries.
pub fn page_bounds(page: usize, page_size: usize) -> (usize, usize) {
    let start = page.saturating_sub(1) * page_size;
    (start, start + page_size.saturating_sub(1))
}

/// Slice an in-memory list into a page. Out-of-range pages are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let (start, _) = page_bounds(page, page_size);
    let slice = items
        .iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();
    Page {
        items: slice,
        total: items.len(),
        page,
        page_size,
    }
}
