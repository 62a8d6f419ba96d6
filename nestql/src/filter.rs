use crate::expr::Predicate;

/// Restrict the rows of some selection or mutation.
///
/// Calling `filter` more than once combines the predicates with AND.
pub trait Filter: Sized {
    fn filter(self, predicate: Predicate) -> Self;
}

/// Restrict the number of rows of a selection.
pub trait Range: Sized {
    fn range<R: IntoRowRange>(self, range: R) -> Self;
}

/// LIMIT / OFFSET pair.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RowRange {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl RowRange {
    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

pub trait IntoRowRange {
    fn into_row_range(self) -> RowRange;
}

impl IntoRowRange for RowRange {
    fn into_row_range(self) -> RowRange {
        self
    }
}

impl IntoRowRange for ::std::ops::Range<usize> {
    fn into_row_range(self) -> RowRange {
        RowRange {
            limit: Some(self.end.saturating_sub(self.start) as u64),
            offset: offset(self.start),
        }
    }
}

impl IntoRowRange for ::std::ops::RangeTo<usize> {
    fn into_row_range(self) -> RowRange {
        RowRange {
            limit: Some(self.end as u64),
            offset: None,
        }
    }
}

impl IntoRowRange for ::std::ops::RangeFrom<usize> {
    fn into_row_range(self) -> RowRange {
        RowRange {
            limit: None,
            offset: offset(self.start),
        }
    }
}

impl IntoRowRange for ::std::ops::RangeFull {
    fn into_row_range(self) -> RowRange {
        RowRange::default()
    }
}

fn offset(start: usize) -> Option<u64> {
    match start {
        0 => None,
        start => Some(start as u64),
    }
}
