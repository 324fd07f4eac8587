use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::{CleanRecord, LegalEntity};

/// Splits the combined tax-id field and irons out the operator names
/// behind it.
///
/// CPF digits arrive partially masked with `*`, so the extracted entity
/// number can be short or empty; grouping only ever uses what is there.
pub struct EntityResolver;

/// Operator-name cleanup statistics.
#[derive(Debug)]
pub struct OperatorOutcome {
    pub distinct_before: usize,
    pub distinct_after: usize,
    /// How many divergent spellings collapsed into their entity's name
    pub names_corrected: usize,
}

impl EntityResolver {
    /// An identifier starting with "CPF" belongs to an individual,
    /// anything else to a company. The entity number is every digit of
    /// the field in source order.
    pub fn split_tax_id(raw: &str) -> (LegalEntity, String) {
        let trimmed = raw.trim();
        let legal_entity = if trimmed.starts_with("CPF") {
            LegalEntity::Individual
        } else {
            LegalEntity::Company
        };
        let entity_number: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        (legal_entity, entity_number)
    }

    /// Rewrites every record of an entity to that entity's canonical
    /// operator name, which is the first one encountered in row order.
    /// The first-seen legal entity overwrites the group as well, keeping
    /// the records of one entity internally consistent.
    ///
    /// Records with an empty entity number are left untouched; a fully
    /// masked tax id gives no grouping signal.
    pub fn canonicalize_operators(records: &mut [CleanRecord]) -> OperatorOutcome {
        let distinct_before = Self::distinct_names(records);

        let mut canonical: HashMap<String, (String, LegalEntity)> = HashMap::new();
        for record in records.iter() {
            if record.entity_number.is_empty() {
                continue;
            }
            if !canonical.contains_key(&record.entity_number) {
                canonical.insert(
                    record.entity_number.clone(),
                    (record.operator_name.clone(), record.legal_entity),
                );
            }
        }

        for record in records.iter_mut() {
            if let Some((name, legal_entity)) = canonical.get(&record.entity_number) {
                if record.operator_name != *name {
                    debug!(
                        "Operator '{}' renamed to '{}' for entity {}",
                        record.operator_name, name, record.entity_number
                    );
                }
                record.operator_name = name.clone();
                record.legal_entity = *legal_entity;
            }
        }

        let distinct_after = Self::distinct_names(records);
        OperatorOutcome {
            distinct_before,
            distinct_after,
            names_corrected: distinct_before - distinct_after,
        }
    }

    fn distinct_names(records: &[CleanRecord]) -> usize {
        records
            .iter()
            .map(|r| r.operator_name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
