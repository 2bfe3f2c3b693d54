//! Row-range bookkeeping for list models.
//!
//! Reconciliation is a prefix diff: only the longest common leading run is
//! recognised as unchanged, everything after the first mismatch is reported
//! as changed. Reorders and mid-sequence inserts or removals are therefore
//! not detected structurally.

use crate::events::ModelEvent;

/// Length of the longest common leading run of `old` and `new`.
pub fn common_prefix_len<T: PartialEq>(old: &[T], new: &[T]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

/// Notifications for replacing `old` with `new`.
///
/// At most one insert or remove over the tail, followed by at most one change
/// notification from the first mismatch to the end of `new`. The change is
/// only reported when a row that existed before differs
/// (`prefix < min(old_len, new_len)`), so a pure append is reported as an
/// insert alone. Do not widen this to `prefix < new_len`: that would also
/// mark freshly appended rows as changed right after inserting them.
pub fn prefix_diff<T: PartialEq>(old: &[T], new: &[T], column_count: usize) -> Vec<ModelEvent> {
    if new.is_empty() {
        return vec![ModelEvent::Reset];
    }

    let prefix = common_prefix_len(old, new);
    let (old_len, new_len) = (old.len(), new.len());
    let mut events = Vec::with_capacity(2);

    if new_len > old_len {
        events.push(ModelEvent::RowsInserted {
            first: old_len,
            last: new_len - 1,
        });
    } else if new_len < old_len {
        events.push(ModelEvent::RowsRemoved {
            first: new_len,
            last: old_len - 1,
        });
    }

    if prefix < old_len.min(new_len) {
        events.push(ModelEvent::RowsChanged {
            first_row: prefix,
            last_row: new_len - 1,
            first_column: 0,
            last_column: column_count.saturating_sub(1),
        });
    }

    events
}

/// Sort and dedup `rows`, then group them into maximal contiguous
/// `(first, last)` runs in ascending order.
pub fn contiguous_runs(rows: &[usize]) -> Vec<(usize, usize)> {
    let mut sorted = rows.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<(usize, usize)> = Vec::new();
    for row in sorted {
        match runs.last_mut() {
            Some((_, last)) if *last + 1 == row => *last = row,
            _ => runs.push((row, row)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(first_row: usize, last_row: usize) -> ModelEvent {
        ModelEvent::RowsChanged {
            first_row,
            last_row,
            first_column: 0,
            last_column: 2,
        }
    }

    #[test]
    fn test_common_prefix() {
        assert_eq!(common_prefix_len(&["a", "b", "c"], &["a", "b", "d"]), 2);
        assert_eq!(common_prefix_len(&["a", "b"], &["a", "b", "c"]), 2);
        assert_eq!(common_prefix_len(&["x"], &["a"]), 0);
        assert_eq!(common_prefix_len::<&str>(&[], &["a"]), 0);
    }

    #[test]
    fn test_same_length_tail_change() {
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &["A", "B", "D"], 3),
            vec![changed(2, 2)]
        );
    }

    #[test]
    fn test_pure_append() {
        assert_eq!(
            prefix_diff(&["A", "B"], &["A", "B", "C", "D"], 3),
            vec![ModelEvent::RowsInserted { first: 2, last: 3 }]
        );
    }

    #[test]
    fn test_pure_truncation() {
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &["A"], 3),
            vec![ModelEvent::RowsRemoved { first: 1, last: 2 }]
        );
    }

    #[test]
    fn test_empty_replacement_is_a_reset() {
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &[], 3),
            vec![ModelEvent::Reset]
        );
    }

    #[test]
    fn test_leading_substitution_marks_everything_changed() {
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &["X", "B", "C"], 3),
            vec![changed(0, 2)]
        );
    }

    #[test]
    fn test_mid_insert_degrades_to_insert_plus_change() {
        // [A, B, C] -> [A, X, B, C]: not detected as a single insert at 1.
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &["A", "X", "B", "C"], 3),
            vec![ModelEvent::RowsInserted { first: 3, last: 3 }, changed(1, 3)]
        );
    }

    #[test]
    fn test_first_load_is_a_pure_insert() {
        assert_eq!(
            prefix_diff(&[], &["A", "B"], 3),
            vec![ModelEvent::RowsInserted { first: 0, last: 1 }]
        );
    }

    #[test]
    fn test_truncation_with_changed_survivor() {
        assert_eq!(
            prefix_diff(&["A", "B", "C"], &["A", "X"], 3),
            vec![ModelEvent::RowsRemoved { first: 2, last: 2 }, changed(1, 1)]
        );
    }

    #[test]
    fn test_identical_sequences_emit_nothing() {
        assert!(prefix_diff(&["A", "B"], &["A", "B"], 3).is_empty());
    }

    #[test]
    fn test_contiguous_runs() {
        assert_eq!(contiguous_runs(&[0, 1, 3]), vec![(0, 1), (3, 3)]);
        assert_eq!(contiguous_runs(&[5, 3, 4, 4, 9]), vec![(3, 5), (9, 9)]);
        assert!(contiguous_runs(&[]).is_empty());
    }
}
