//! Due-date arithmetic for recurring reporting obligations.
//!
//! This crate provides:
//! - Occurrence calculation from an anchor date and a month interval
//! - Lazy enumeration of occurrences inside a date window
//! - Offset matching: which "days before due" reminders fire on a given day

pub mod offsets;
pub mod recurrence;

pub use offsets::{matching_offsets, max_offset, offset_label, send_day};
pub use recurrence::{
    generate_occurrences, next_occurrence, nth_occurrence, previous_occurrence, Occurrences,
    DEFAULT_MAX_OCCURRENCES,
};
