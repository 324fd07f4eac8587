use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::RawRecord;
use crate::error::{PipelineError, Result};

/// Aircraft identifiers are two letters for the registration class
/// followed by nine digits: PR (recreational), PP (basic), PS (advanced).
static AIRCRAFT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(PR|PP|PS)-\d{9}$").unwrap());

/// Filters records down to well-formed, unique aircraft identifiers.
pub struct IdentifierValidator;

/// What validation kept and what it threw away.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub records: Vec<RawRecord>,
    pub rows_in: usize,
    /// Rows removed because the cleaned identifier does not match the pattern
    pub invalid_ids: usize,
    /// Pattern-valid rows removed as earlier occurrences of a repeated identifier
    pub duplicates_removed: usize,
}

impl IdentifierValidator {
    /// Strips the padding and internal spaces operators manage to get
    /// into the identifier field.
    pub fn clean_id(raw: &str) -> String {
        raw.trim().replace(' ', "")
    }

    pub fn is_valid_id(id: &str) -> bool {
        AIRCRAFT_ID_PATTERN.is_match(id)
    }

    /// Cleans every identifier, drops pattern mismatches, then removes
    /// duplicate identifiers keeping the last occurrence in row order.
    /// Later rows are presumed to be the more recent submission.
    ///
    /// Survivors keep their relative order. An empty result is fatal.
    pub fn validate(records: Vec<RawRecord>) -> Result<ValidationOutcome> {
        let rows_in = records.len();

        let mut valid = Vec::with_capacity(records.len());
        let mut invalid_ids = 0;
        for mut record in records {
            let cleaned = Self::clean_id(&record.aircraft_id);
            if Self::is_valid_id(&cleaned) {
                record.aircraft_id = cleaned;
                valid.push(record);
            } else {
                debug!("Dropping malformed aircraft id '{}'", record.aircraft_id);
                invalid_ids += 1;
            }
        }

        let valid_count = valid.len();
        let mut last_index: HashMap<String, usize> = HashMap::new();
        for (idx, record) in valid.iter().enumerate() {
            last_index.insert(record.aircraft_id.clone(), idx);
        }

        let retained: Vec<RawRecord> = valid
            .into_iter()
            .enumerate()
            .filter(|(idx, record)| last_index[&record.aircraft_id] == *idx)
            .map(|(_, record)| record)
            .collect();
        let duplicates_removed = valid_count - retained.len();

        if retained.is_empty() {
            return Err(PipelineError::ZeroSurvivors {
                stage: "validation",
                rows_in,
            });
        }

        Ok(ValidationOutcome {
            records: retained,
            rows_in,
            invalid_ids,
            duplicates_removed,
        })
    }
}
