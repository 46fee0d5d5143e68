use std::borrow::Borrow;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::model::{Reading, ReadingTable};

// ---------------------------------------------------------------------------
// Selector – the value chosen in a dropdown / multi-select
// ---------------------------------------------------------------------------

/// A UI-driven predicate value.
///
/// `All` is the wildcard: the predicate is omitted entirely rather than
/// matched against every known value. An empty `Set` matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector<T: Ord> {
    All,
    One(T),
    Set(BTreeSet<T>),
}

impl<T: Ord> Default for Selector<T> {
    fn default() -> Self {
        Selector::All
    }
}

impl<T: Ord> Selector<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }

    /// `None` when the selector is the wildcard (no predicate to evaluate).
    pub fn test<Q>(&self, value: Option<&Q>) -> Option<bool>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Selector::All => None,
            Selector::One(v) => Some(value == Some(Borrow::<Q>::borrow(v))),
            Selector::Set(set) => Some(value.is_some_and(|v| set.contains(v))),
        }
    }
}

// ---------------------------------------------------------------------------
// Date range widgets → inclusive datetime bounds
// ---------------------------------------------------------------------------

/// Calendar dates picked in the UI. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Start of the first day to the last instant of the last day.
    pub fn to_bounds(self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .end
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
            .and_utc();
        (start, end)
    }

    /// The dates covering the whole table; today when the table is empty.
    pub fn covering(table: &ReadingTable) -> Self {
        match table.time_span() {
            Some((first, last)) => DateRange {
                start: first.date_naive(),
                end: last.date_naive(),
            },
            None => {
                let today = Utc::now().date_naive();
                DateRange {
                    start: today,
                    end: today,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter – all active predicates combined with AND
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub vehicles: Selector<String>,
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Inclusive upper bound.
    pub end: DateTime<Utc>,
    pub province: Selector<String>,
}

impl Filter {
    pub fn new(vehicles: Selector<String>, range: DateRange) -> Self {
        let (start, end) = range.to_bounds();
        Filter {
            vehicles,
            start,
            end,
            province: Selector::All,
        }
    }

    pub fn with_province(mut self, province: Selector<String>) -> Self {
        self.province = province;
        self
    }

    /// A reading passes when every non-wildcard predicate holds.
    pub fn matches(&self, r: &Reading) -> bool {
        if self.vehicles.test(Some(r.vehicle_id.as_str())) == Some(false) {
            return false;
        }
        if r.timestamp < self.start || r.timestamp > self.end {
            return false;
        }
        self.province.test(r.province.as_deref()) != Some(false)
    }

    /// Narrow a view of `table` down to the rows passing this filter.
    pub fn apply(&self, table: &ReadingTable, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&i| table.get(i).is_some_and(|r| self.matches(r)))
            .collect()
    }
}

/// Return indices of readings that pass `filter`, in table order.
pub fn filtered_indices(table: &ReadingTable, filter: &Filter) -> Vec<usize> {
    let every_row: Vec<usize> = (0..table.len()).collect();
    filter.apply(table, &every_row)
}
