//! 🚧 Filters: the bouncer at the door of the fetch queue.
//!
//! Two independent checks, both must pass:
//! - size: objects bigger than the configured cap are never downloaded
//! - time: only when `end > start`, `last_modified` must sit inside `[start, end]`
//!   (inclusive), with a zero bound meaning "no bound on that side"
//!
//! Cheap, pure, synchronous. The only function in the crate that can't fail. 🦆

use crate::common::{ObjectDescriptor, SearchRequest};

/// ⏱️ Optional time window. Inert unless `end > start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TimeWindow {
    pub(crate) start: i64,
    pub(crate) end: i64,
}

impl TimeWindow {
    pub(crate) fn is_active(&self) -> bool {
        self.end > self.start
    }

    pub(crate) fn admits(&self, last_modified: i64) -> bool {
        if !self.is_active() {
            return true;
        }
        if self.start != 0 && last_modified < self.start {
            return false;
        }
        if self.end != 0 && last_modified > self.end {
            return false;
        }
        true
    }
}

/// 🚧 Size cap + time window, AND-combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ObjectFilter {
    pub(crate) max_object_size_bytes: u64,
    pub(crate) window: TimeWindow,
}

impl ObjectFilter {
    pub(crate) fn new(max_object_size_bytes: u64, request: &SearchRequest) -> Self {
        Self {
            max_object_size_bytes,
            window: TimeWindow {
                start: request.start_time,
                end: request.end_time,
            },
        }
    }

    /// ✅ Should this object be fetched at all?
    pub(crate) fn admits(&self, object: &ObjectDescriptor) -> bool {
        object.size <= self.max_object_size_bytes && self.window.admits(object.last_modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(max: u64, start: i64, end: i64) -> ObjectFilter {
        ObjectFilter {
            max_object_size_bytes: max,
            window: TimeWindow { start, end },
        }
    }

    #[test]
    fn the_one_where_exactly_the_cap_is_fine_but_one_more_byte_is_not() {
        let the_filter = filter(100, 0, 0);
        assert!(the_filter.admits(&ObjectDescriptor::new("fits.log", 100, 0)));
        assert!(!the_filter.admits(&ObjectDescriptor::new("chonk.log", 101, 0)));
        assert!(the_filter.admits(&ObjectDescriptor::new("empty.log", 0, 0)));
    }

    #[test]
    fn the_one_where_a_backwards_window_is_asleep() {
        // 🛌 end <= start: every timestamp gets in
        for (start, end) in [(0, 0), (500, 500), (900, 100), (100, 0)] {
            let the_filter = filter(u64::MAX, start, end);
            for ts in [-5, 0, 99, 100, 500, 10_000] {
                assert!(
                    the_filter.admits(&ObjectDescriptor::new("k", 1, ts)),
                    "window ({}, {}) should be inert but rejected {}",
                    start,
                    end,
                    ts
                );
            }
        }
    }

    #[test]
    fn the_one_where_both_bounds_are_inclusive() {
        let the_filter = filter(u64::MAX, 100, 200);
        assert!(the_filter.admits(&ObjectDescriptor::new("first", 1, 100)));
        assert!(the_filter.admits(&ObjectDescriptor::new("last", 1, 200)));
        assert!(the_filter.admits(&ObjectDescriptor::new("middle", 1, 150)));
        assert!(!the_filter.admits(&ObjectDescriptor::new("early", 1, 99)));
        assert!(!the_filter.admits(&ObjectDescriptor::new("late", 1, 201)));
    }

    #[test]
    fn the_one_where_a_zero_start_means_since_the_dawn_of_time() {
        let the_filter = filter(u64::MAX, 0, 200);
        assert!(the_filter.admits(&ObjectDescriptor::new("ancient", 1, -1_000)));
        assert!(!the_filter.admits(&ObjectDescriptor::new("future", 1, 201)));
    }

    #[test]
    fn the_one_where_size_and_time_must_both_agree() {
        let the_filter = filter(10, 100, 200);
        assert!(!the_filter.admits(&ObjectDescriptor::new("right time, too big", 11, 150)));
        assert!(!the_filter.admits(&ObjectDescriptor::new("small, wrong time", 5, 300)));
        assert!(the_filter.admits(&ObjectDescriptor::new("goldilocks", 10, 150)));
    }

    #[test]
    fn the_one_where_the_request_feeds_the_window() {
        let request = SearchRequest {
            bucket: "logs".into(),
            pattern: "x".into(),
            result_count: 1,
            region: "r".into(),
            start_time: 10,
            end_time: 20,
        };
        let the_filter = ObjectFilter::new(42, &request);
        assert_eq!(the_filter.max_object_size_bytes, 42);
        assert!(the_filter.window.is_active());
    }
}
