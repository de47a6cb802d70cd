//! Bounded store of the best distinct assignments an optimizer visits.

use crate::cfn::CostFunctionNetworkSolution;
use crate::error::Result;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    assignment: Vec<usize>,
    score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    times_seen: usize,
    stored: bool,
}

/// Keeps at most `capacity` distinct assignments, lowest score first.
///
/// Offering an assignment that is already stored only bumps its count.
/// Counts outlive eviction: an assignment that was stored once keeps
/// accumulating visits and brings its total back if it re-enters.
#[derive(Debug, Clone)]
pub(crate) struct SolutionCollector {
    capacity: usize,
    entries: Vec<Entry>,
    tallies: HashMap<Vec<usize>, Tally>,
}

impl SolutionCollector {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            tallies: HashMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn worst_score(&self) -> Option<f64> {
        self.entries.last().map(|e| e.score)
    }

    /// Records a visit to `assignment`.
    pub(crate) fn offer(&mut self, assignment: &[usize], score: f64) {
        self.offer_seen(assignment, score, 1);
    }

    fn offer_seen(&mut self, assignment: &[usize], score: f64, times_seen: usize) {
        if self.capacity == 0 || score.is_nan() {
            return;
        }
        if let Some(tally) = self.tallies.get_mut(assignment) {
            tally.times_seen += times_seen;
            if tally.stored {
                return;
            }
        } else if self.entries.len() < self.capacity
            || self.worst_score().is_some_and(|worst| score < worst)
        {
            self.tallies.insert(
                assignment.to_vec(),
                Tally {
                    times_seen,
                    stored: false,
                },
            );
        } else {
            return;
        }

        if self.entries.len() == self.capacity {
            match self.worst_score() {
                Some(worst) if score < worst => self.evict_worst(),
                _ => return,
            }
        }
        if let Some(tally) = self.tallies.get_mut(assignment) {
            tally.stored = true;
        }
        let at = self.entries.partition_point(|e| e.score <= score);
        self.entries.insert(
            at,
            Entry {
                assignment: assignment.to_vec(),
                score,
            },
        );
    }

    fn evict_worst(&mut self) {
        if let Some(evicted) = self.entries.pop() {
            if let Some(tally) = self.tallies.get_mut(&evicted.assignment) {
                tally.stored = false;
            }
        }
    }

    fn times_seen(&self, assignment: &[usize]) -> usize {
        self.tallies.get(assignment).map_or(1, |t| t.times_seen)
    }

    /// Folds another collector's entries and visit counts into this one.
    pub(crate) fn merge(&mut self, other: SolutionCollector) {
        let SolutionCollector {
            entries, tallies, ..
        } = other;
        for entry in entries {
            let times_seen = tallies.get(&entry.assignment).map_or(1, |t| t.times_seen);
            self.offer_seen(&entry.assignment, entry.score, times_seen);
        }
        for (assignment, tally) in tallies {
            if tally.stored {
                continue;
            }
            if self.capacity == 0 {
                break;
            }
            self.tallies
                .entry(assignment)
                .or_insert(Tally {
                    times_seen: 0,
                    stored: false,
                })
                .times_seen += tally.times_seen;
        }
    }

    /// Replaces every stored score with `score(assignment)` and re-sorts.
    ///
    /// Used to remove drift accumulated by summing score changes.
    pub(crate) fn rescore<F>(&mut self, mut score: F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Result<f64>,
    {
        for entry in &mut self.entries {
            entry.score = score(&entry.assignment)?;
        }
        self.entries
            .sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        Ok(())
    }

    pub(crate) fn into_solutions(self) -> Vec<CostFunctionNetworkSolution> {
        let times: Vec<usize> = self
            .entries
            .iter()
            .map(|e| self.times_seen(&e.assignment))
            .collect();
        self.entries
            .into_iter()
            .zip(times)
            .map(|(e, times_seen)| {
                CostFunctionNetworkSolution::new(e.assignment, e.score).with_times_seen(times_seen)
            })
            .collect()
    }
}
