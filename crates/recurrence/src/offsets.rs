//! Offset matching: which "days before due" reminders fire on a given day.

use chrono::{Days, NaiveDate};

/// The day a reminder `offset_days` before `due` should go out.
pub fn send_day(due: NaiveDate, offset_days: u32) -> Option<NaiveDate> {
    due.checked_sub_days(Days::new(u64::from(offset_days)))
}

/// Every offset in `offsets` whose send day for `due` is `today`, in input order.
pub fn matching_offsets(due: NaiveDate, today: NaiveDate, offsets: &[u32]) -> Vec<u32> {
    offsets
        .iter()
        .copied()
        .filter(|&offset| send_day(due, offset) == Some(today))
        .collect()
}

/// Largest offset, i.e. how far ahead of a due date reminders start.
pub fn max_offset(offsets: &[u32]) -> Option<u32> {
    offsets.iter().copied().max()
}

/// Human-readable label used in reminder subjects.
///
/// Positive offsets read `H-N`, the due day itself `HARI H`. Negative offsets
/// (`H+N`, after the due date) are reserved: schedules cannot configure them.
pub fn offset_label(offset_days: i64) -> String {
    match offset_days {
        n if n > 0 => format!("H-{n}"),
        0 => "HARI H".to_string(),
        n => format!("H+{}", n.unsigned_abs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn matches_exact_offsets_only() {
        let due = d(2025, 3, 15);
        assert_eq!(matching_offsets(due, d(2025, 3, 8), &[7, 3, 1, 0]), vec![7]);
        assert_eq!(matching_offsets(due, d(2025, 3, 15), &[7, 3, 1, 0]), vec![0]);
        assert!(matching_offsets(due, d(2025, 3, 9), &[7, 3, 1, 0]).is_empty());
    }

    #[test]
    fn one_off_schedule_days() {
        let due = d(2025, 6, 1);
        let offsets = [3, 0];
        assert_eq!(matching_offsets(due, d(2025, 5, 29), &offsets), vec![3]);
        assert_eq!(matching_offsets(due, d(2025, 6, 1), &offsets), vec![0]);
        assert!(matching_offsets(due, d(2025, 6, 2), &offsets).is_empty());
    }

    #[test]
    fn offsets_crossing_month_boundary() {
        assert_eq!(matching_offsets(d(2025, 3, 2), d(2025, 2, 23), &[7]), vec![7]);
    }

    #[test]
    fn matching_is_exact_for_every_offset() {
        let due = d(2025, 12, 31);
        let offsets: Vec<u32> = (0..60).collect();
        for back in 0..90u32 {
            let today = send_day(due, back).unwrap();
            let got = matching_offsets(due, today, &offsets);
            if back < 60 {
                assert_eq!(got, vec![back]);
            } else {
                assert!(got.is_empty());
            }
        }
    }

    #[test]
    fn labels() {
        assert_eq!(offset_label(7), "H-7");
        assert_eq!(offset_label(0), "HARI H");
        assert_eq!(offset_label(-2), "H+2");
    }

    #[test]
    fn max_offset_of_empty_is_none() {
        assert_eq!(max_offset(&[]), None);
        assert_eq!(max_offset(&[1, 30, 7]), Some(30));
    }
}
