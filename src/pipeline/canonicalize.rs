use std::collections::HashSet;

use regex::Regex;

use crate::config::RuleSpec;
use crate::error::{PipelineError, Result};

/// Normalization applied to every categorical column ahead of rule
/// matching: lowercase, trim, and remove internal spaces. Patterns are
/// written lowercase and space-free to match.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "")
}

/// An ordered list of compiled canonicalization rules.
///
/// Matching is substring search against the normalized value, and the
/// last rule in the list that matches provides the label. A catch-all
/// pattern therefore belongs at the front of the list, where every later
/// rule can override it.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

#[derive(Debug)]
struct CompiledRule {
    label: String,
    pattern: Regex,
}

/// A rewritten column plus how many of its values matched some rule.
#[derive(Debug)]
pub struct ColumnRewrite {
    pub values: Vec<String>,
    pub matched: usize,
}

impl RuleSet {
    /// Compiles an ordered rule list. A malformed pattern or a repeated
    /// label anywhere in the list fails the whole set before any value
    /// is processed.
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let mut seen_labels = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());

        for spec in specs {
            if !seen_labels.insert(spec.label.clone()) {
                return Err(PipelineError::DuplicateLabel(spec.label.clone()));
            }
            let pattern = Regex::new(&spec.pattern).map_err(|e| PipelineError::Rule {
                label: spec.label.clone(),
                source: e,
            })?;
            rules.push(CompiledRule {
                label: spec.label.clone(),
                pattern,
            });
        }

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Canonicalizes a single raw value. Unmatched values pass through
    /// as their normalized text and stay candidates for bucketing.
    pub fn canonicalize(&self, raw: &str) -> String {
        let normalized = normalize_category(raw);
        match self.matching_label(&normalized) {
            Some(label) => label.to_string(),
            None => normalized,
        }
    }

    /// Rewrites a whole column, returning the new values in order.
    pub fn rewrite_column(&self, values: &[String]) -> ColumnRewrite {
        let mut rewritten = Vec::with_capacity(values.len());
        let mut matched = 0;

        for raw in values {
            let normalized = normalize_category(raw);
            match self.matching_label(&normalized) {
                Some(label) => {
                    matched += 1;
                    rewritten.push(label.to_string());
                }
                None => rewritten.push(normalized),
            }
        }

        ColumnRewrite {
            values: rewritten,
            matched,
        }
    }

    /// The label of the last rule matching `normalized`, if any.
    fn matching_label(&self, normalized: &str) -> Option<&str> {
        let mut label = None;
        for rule in &self.rules {
            if rule.pattern.is_match(normalized) {
                label = Some(rule.label.as_str());
            }
        }
        label
    }
}
