use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyCount {
    /// `None` is the null bucket.
    pub label: Option<String>,
    pub count: usize,
}

/// Counts labels, remembering the order in which each was first seen.
#[derive(Debug, Default)]
pub struct FrequencyAccumulator {
    order: Vec<Option<String>>,
    counts: HashMap<Option<String>, usize>,
    total: usize,
}

impl FrequencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, label: Option<String>) {
        self.total += 1;
        match self.counts.get_mut(&label) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(label.clone(), 1);
                self.order.push(label);
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Counts ordered by count descending; equal counts keep first-seen order.
    pub fn into_counts(self) -> Vec<FrequencyCount> {
        let Self { order, counts, .. } = self;
        let mut items = order
            .into_iter()
            .map(|label| {
                let count = counts.get(&label).copied().unwrap_or_default();
                FrequencyCount { label, count }
            })
            .collect::<Vec<_>>();
        items.sort_by(|a, b| b.count.cmp(&a.count));
        items
    }
}

pub fn value_counts<I>(labels: I) -> Vec<FrequencyCount>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut accumulator = FrequencyAccumulator::new();
    for label in labels {
        accumulator.ingest(label);
    }
    accumulator.into_counts()
}
