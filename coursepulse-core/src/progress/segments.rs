//! Watched-segment merging.
//!
//! Segments are closed intervals: two segments that share an endpoint are
//! merged into one. Storage keeps only the merged set, so callers must merge
//! the union of stored and newly reported segments.

use crate::types::WatchedSegment;

/// Merge possibly overlapping, unordered segments into the minimal sorted
/// list of disjoint segments covering the same time.
pub fn merge_segments(segments: &[WatchedSegment]) -> Vec<WatchedSegment> {
    let mut sorted = segments.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<WatchedSegment> = Vec::with_capacity(sorted.len());
    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        if next.start <= current.end {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);

    merged
}

/// Merge newly reported segments into an already merged set.
pub fn merge_into(existing: &[WatchedSegment], reported: &[WatchedSegment]) -> Vec<WatchedSegment> {
    let mut union = Vec::with_capacity(existing.len() + reported.len());
    union.extend_from_slice(existing);
    union.extend_from_slice(reported);
    merge_segments(&union)
}

/// Sum of segment durations in seconds.
pub fn total_watch_time(segments: &[WatchedSegment]) -> f64 {
    segments.iter().map(WatchedSegment::duration).sum()
}
