//! Occurrence calculation for anchor + month-interval recurrences.
//!
//! Occurrence `k` of a series is `anchor + k * interval` calendar months,
//! always computed from the anchor rather than by stepping from the previous
//! occurrence. When the anchor's day does not exist in the target month the
//! date is clamped to that month's last day, so a Jan 31 anchor with a
//! monthly interval yields Feb 28 (29), Mar 31, Apr 30, ... without drifting.
//!
//! An interval of 0 denotes a one-off obligation whose only occurrence is
//! the anchor itself.

use std::iter::FusedIterator;

use chrono::{Datelike, Months, NaiveDate};

/// Cap on occurrences produced by [`generate_occurrences`] callers that have
/// no better bound.
pub const DEFAULT_MAX_OCCURRENCES: usize = 24;

/// Occurrence number `index` of the series (index 0 is the anchor).
///
/// Returns `None` when the date would overflow chrono's range, or for any
/// index other than 0 of a one-off series.
pub fn nth_occurrence(anchor: NaiveDate, interval_months: u32, index: u32) -> Option<NaiveDate> {
    if index == 0 {
        return Some(anchor);
    }
    if interval_months == 0 {
        return None;
    }
    let months = interval_months.checked_mul(index)?;
    anchor.checked_add_months(Months::new(months))
}

/// Index of the first occurrence on or after `reference`.
fn next_index(anchor: NaiveDate, interval_months: u32, reference: NaiveDate) -> Option<u32> {
    if anchor >= reference {
        return Some(0);
    }
    if interval_months == 0 {
        return None;
    }

    // anchor < reference here, so the month distance is non-negative.
    let months_between = (reference.year() - anchor.year()) * 12 + reference.month() as i32
        - anchor.month() as i32;
    let k = u32::try_from(months_between).ok()? / interval_months;

    // Occurrence k lands in a month at or before the reference month;
    // occurrence k + 1 lands strictly after it.
    let candidate = nth_occurrence(anchor, interval_months, k)?;
    if candidate >= reference {
        Some(k)
    } else {
        k.checked_add(1)
    }
}

/// The earliest occurrence that is `>= reference`.
///
/// A one-off series yields the anchor if it has not passed yet, else `None`.
pub fn next_occurrence(
    anchor: NaiveDate,
    interval_months: u32,
    reference: NaiveDate,
) -> Option<NaiveDate> {
    let index = next_index(anchor, interval_months, reference)?;
    nth_occurrence(anchor, interval_months, index)
}

/// The occurrence immediately preceding [`next_occurrence`].
///
/// `None` for one-off series and when the next occurrence is the anchor
/// (the series has no earlier member).
pub fn previous_occurrence(
    anchor: NaiveDate,
    interval_months: u32,
    reference: NaiveDate,
) -> Option<NaiveDate> {
    if interval_months == 0 {
        return None;
    }
    let index = next_index(anchor, interval_months, reference)?;
    let previous = index.checked_sub(1)?;
    nth_occurrence(anchor, interval_months, previous)
}

/// Occurrences within `[start, end]`, at most `max_count` of them.
///
/// The returned iterator is lazy and cheap to clone; cloning it before
/// consumption restarts the enumeration from `start`.
pub fn generate_occurrences(
    anchor: NaiveDate,
    interval_months: u32,
    start: NaiveDate,
    end: NaiveDate,
    max_count: usize,
) -> Occurrences {
    Occurrences {
        anchor,
        interval_months,
        next_index: next_index(anchor, interval_months, start),
        end,
        remaining: max_count,
    }
}

/// Iterator returned by [`generate_occurrences`].
#[derive(Debug, Clone)]
pub struct Occurrences {
    anchor: NaiveDate,
    interval_months: u32,
    next_index: Option<u32>,
    end: NaiveDate,
    remaining: usize,
}

impl Iterator for Occurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.next_index?;
        let Some(date) = nth_occurrence(self.anchor, self.interval_months, index)
            .filter(|d| *d <= self.end)
        else {
            self.next_index = None;
            return None;
        };

        self.remaining -= 1;
        self.next_index = if self.interval_months == 0 {
            None
        } else {
            index.checked_add(1)
        };
        Some(date)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_index {
            Some(_) => (0, Some(self.remaining)),
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for Occurrences {}
