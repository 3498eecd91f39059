//! Resolution of delete-log entries to insert offsets.

use crate::Timestamp;

/// Pick the row a delete applies to.
///
/// `candidates` are the insert offsets sharing the deleted primary key. A row
/// qualifies when it lies below `insert_barrier`, is older than the query,
/// and was inserted before the delete itself. Among qualifying rows the
/// largest offset wins: it is the most recent incarnation of the key the
/// delete could have seen. Returns `None` when nothing qualifies.
pub fn resolve_delete_target(
    candidates: &[i64],
    insert_barrier: i64,
    query_timestamp: Timestamp,
    delete_timestamp: Timestamp,
    timestamp_of: impl Fn(i64) -> Option<Timestamp>,
) -> Option<i64> {
    candidates
        .iter()
        .copied()
        .filter(|&offset| offset >= 0 && offset < insert_barrier)
        .filter(|&offset| {
            timestamp_of(offset)
                .is_some_and(|ts| ts < query_timestamp && ts < delete_timestamp)
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    // offset -> timestamp
    const TIMESTAMPS: [Timestamp; 5] = [10, 20, 30, 40, 50];

    fn ts(offset: i64) -> Option<Timestamp> {
        TIMESTAMPS.get(offset as usize).copied()
    }

    #[test]
    fn test_picks_max_qualifying_offset() {
        assert_eq!(resolve_delete_target(&[0, 3], 5, 100, 100, ts), Some(3));
        assert_eq!(resolve_delete_target(&[3, 0], 5, 100, 100, ts), Some(3));
    }

    #[test]
    fn test_insert_barrier_bounds_candidates() {
        assert_eq!(resolve_delete_target(&[0, 3], 3, 100, 100, ts), Some(0));
        assert_eq!(resolve_delete_target(&[3], 3, 100, 100, ts), None);
    }

    #[test]
    fn test_query_timestamp_bounds_candidates() {
        assert_eq!(resolve_delete_target(&[0, 3], 5, 40, 100, ts), Some(0));
        assert_eq!(resolve_delete_target(&[0], 5, 10, 100, ts), None);
    }

    #[test]
    fn test_reinsert_after_delete_survives() {
        // key inserted at 10, deleted at 35, inserted again at 40
        assert_eq!(resolve_delete_target(&[0, 3], 5, 50, 35, ts), Some(0));
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(resolve_delete_target(&[], 5, 100, 100, ts), None);
        assert_eq!(resolve_delete_target(&[9], 10, 100, 100, ts), None);
    }
}
