use std::cmp::Ordering;

use super::schedule_graph::{StopIdx, TripIdx};
use crate::Time;

/// How a label's stop was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Via {
    Origin,
    Trip { trip: TripIdx, departure_time: Time },
    Transfer { duration: Time },
}

/// A (stop, time) node of the time-expanded search, linked to its predecessor
#[derive(Debug, Clone, Copy)]
pub(super) struct Label {
    pub(super) stop: StopIdx,
    pub(super) time: Time,
    pub(super) parent: Option<usize>,
    pub(super) via: Via,
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub(super) struct FrontierEntry {
    pub(super) time: Time,
    /// Insertion counter, breaks ties in favour of earlier pushes
    pub(super) seq: u64,
    pub(super) label: usize,
}

// Min-heap by (time, seq), reversed for BinaryHeap
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn frontier_pops_earliest_then_oldest() {
        let mut heap = BinaryHeap::new();
        for (time, seq) in [(300, 0), (100, 1), (100, 2), (200, 3)] {
            heap.push(FrontierEntry {
                time,
                seq,
                label: seq as usize,
            });
        }
        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|e| e.label)).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }
}
