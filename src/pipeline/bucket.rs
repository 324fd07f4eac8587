use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

/// Literal every long-tail value collapses into.
pub const OTHERS_LABEL: &str = "others";

/// Collapses the distinct values outside the top `keep_top` most
/// frequent into [`OTHERS_LABEL`].
///
/// Ranking is by count descending, then label ascending, so runs over
/// the same data always keep the same labels.
pub struct LongTailBucketer {
    keep_top: usize,
}

/// A bucketed column plus what the cutoff did to it.
#[derive(Debug)]
pub struct BucketOutcome {
    pub values: Vec<String>,
    /// Labels retained unchanged, in rank order
    pub kept_labels: Vec<String>,
    /// Distinct labels collapsed into the others bucket
    pub collapsed_labels: usize,
    /// Individual values rewritten to the others bucket
    pub collapsed_values: usize,
}

impl LongTailBucketer {
    pub fn new(keep_top: usize) -> Self {
        Self { keep_top }
    }

    pub fn bucket(&self, values: &[String]) -> BucketOutcome {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values {
            *counts.entry(value.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        // A tie straddling the cutoff rank is resolved by label order;
        // worth surfacing since the data alone does not decide it.
        if self.keep_top > 0 && ranked.len() > self.keep_top {
            let last_kept = &ranked[self.keep_top - 1];
            let first_cut = &ranked[self.keep_top];
            if last_kept.1 == first_cut.1 {
                info!(
                    "Tie at the cutoff rank: keeping '{}' over '{}' (both {} occurrences)",
                    last_kept.0, first_cut.0, last_kept.1
                );
            }
        }

        let kept_labels: Vec<String> = ranked
            .iter()
            .take(self.keep_top)
            .map(|(label, _)| label.to_string())
            .collect();
        let kept_set: HashSet<&str> = kept_labels.iter().map(|l| l.as_str()).collect();

        let mut collapsed_values = 0;
        let bucketed: Vec<String> = values
            .iter()
            .map(|value| {
                if kept_set.contains(value.as_str()) {
                    value.clone()
                } else {
                    collapsed_values += 1;
                    OTHERS_LABEL.to_string()
                }
            })
            .collect();

        let collapsed_labels = ranked.len() - kept_labels.len();
        debug!(
            "Bucketed column: kept {} labels, collapsed {} labels ({} values)",
            kept_labels.len(),
            collapsed_labels,
            collapsed_values
        );

        BucketOutcome {
            values: bucketed,
            kept_labels,
            collapsed_labels,
            collapsed_values,
        }
    }
}
