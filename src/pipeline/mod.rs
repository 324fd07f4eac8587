// Batch pipeline: identifier validation, entity resolution, status
// derivation, categorical canonicalization, and long-tail bucketing.

pub mod bucket;
pub mod canonicalize;
pub mod entity;
pub mod status;
pub mod validate;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::domain::{CleanRecord, RawRecord, TypeOfUse};
use crate::error::{PipelineError, Result};
use bucket::LongTailBucketer;
use canonicalize::{normalize_category, RuleSet};
use entity::EntityResolver;
use status::StatusClassifier;
use validate::IdentifierValidator;

/// Counters for a complete pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Reference date every status was derived against
    pub today: NaiveDate,
    pub rows_in: usize,
    pub invalid_ids: usize,
    pub duplicates_removed: usize,
    pub missing_field_drops: usize,
    pub bad_date_drops: usize,
    pub unknown_use_drops: usize,
    pub operator_names_corrected: usize,
    pub manufacturers_matched: usize,
    pub activities_matched: usize,
    pub manufacturer_labels_collapsed: usize,
    pub activity_labels_collapsed: usize,
    /// Records inside the scoped model pass, zero when none is configured
    pub scoped_records: usize,
    pub model_labels_collapsed: usize,
    pub rows_out: usize,
}

/// The pipeline's output: canonicalized records plus the run's counters.
/// Consumers read it; nothing here is meant to be mutated afterwards.
#[derive(Debug, Serialize)]
pub struct CleanBatch {
    pub records: Vec<CleanRecord>,
    pub report: PipelineReport,
}

impl CleanBatch {
    /// Index over the unique aircraft identifiers.
    pub fn by_aircraft_id(&self) -> HashMap<&str, &CleanRecord> {
        self.records
            .iter()
            .map(|record| (record.aircraft_id.as_str(), record))
            .collect()
    }

    /// Persist the batch (records and report) as pretty JSON.
    pub fn persist_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_content = serde_json::to_string_pretty(self)?;
        fs::write(path, json_content)?;
        Ok(())
    }
}

struct CompiledModelScope {
    manufacturer: String,
    rules: RuleSet,
    bucketer: LongTailBucketer,
}

/// Fixed-order batch pipeline over registry rows.
///
/// Rule sets compile once at construction and are only read afterwards,
/// so one `Pipeline` can serve any number of batches.
pub struct Pipeline {
    manufacturer_rules: RuleSet,
    activity_rules: RuleSet,
    manufacturer_bucketer: LongTailBucketer,
    activity_bucketer: LongTailBucketer,
    model_scope: Option<CompiledModelScope>,
    classifier: StatusClassifier,
}

impl Pipeline {
    /// Compiles the configured rule sets and resolves the reference
    /// date. Configuration problems surface here, before any row is
    /// touched.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let manufacturer_rules = RuleSet::compile(&config.manufacturer_rules)?;
        let activity_rules = RuleSet::compile(&config.activity_rules)?;

        let model_scope = match &config.model_scope {
            Some(scope) => Some(CompiledModelScope {
                manufacturer: scope.manufacturer.clone(),
                rules: RuleSet::compile(&scope.rules)?,
                bucketer: LongTailBucketer::new(scope.keep_top),
            }),
            None => None,
        };

        let today = config.today.unwrap_or_else(|| Utc::now().date_naive());

        Ok(Self {
            manufacturer_rules,
            activity_rules,
            manufacturer_bucketer: LongTailBucketer::new(config.manufacturer_keep_top),
            activity_bucketer: LongTailBucketer::new(config.activity_keep_top),
            model_scope,
            classifier: StatusClassifier::new(today),
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.classifier.today()
    }

    /// Runs every stage in order over one batch. Any failure is fatal
    /// for the whole batch; there is no partial output.
    pub fn run(&self, records: Vec<RawRecord>) -> Result<CleanBatch> {
        info!("🚀 Starting registry pipeline for {} rows", records.len());
        counter!("sisant_pipeline_runs_total").increment(1);
        let t_run = std::time::Instant::now();

        // Stage 1 and 2: identifier validation, then deduplication
        let validation = IdentifierValidator::validate(records)?;
        info!(
            "✅ Identifiers: {} rows in, {} malformed, {} duplicates removed",
            validation.rows_in, validation.invalid_ids, validation.duplicates_removed
        );
        counter!("sisant_rows_dropped_total", "reason" => "invalid_id")
            .increment(validation.invalid_ids as u64);
        counter!("sisant_rows_dropped_total", "reason" => "duplicate_id")
            .increment(validation.duplicates_removed as u64);

        // Stage 3: typed record assembly
        let rows_validated = validation.records.len();
        let (mut clean, assembly) = self.assemble(validation.records);
        info!(
            "✅ Assembly: {} records typed ({} missing fields, {} bad dates, {} unknown use types)",
            clean.len(),
            assembly.missing_field,
            assembly.bad_date,
            assembly.unknown_use
        );
        counter!("sisant_rows_dropped_total", "reason" => "missing_field")
            .increment(assembly.missing_field as u64);
        counter!("sisant_rows_dropped_total", "reason" => "bad_date")
            .increment(assembly.bad_date as u64);
        counter!("sisant_rows_dropped_total", "reason" => "unknown_use")
            .increment(assembly.unknown_use as u64);
        if clean.is_empty() {
            return Err(PipelineError::ZeroSurvivors {
                stage: "assembly",
                rows_in: rows_validated,
            });
        }

        // Stage 4: operator names, one per entity
        let operators = EntityResolver::canonicalize_operators(&mut clean);
        info!(
            "✅ Operators: {} of {} distinct spellings corrected",
            operators.names_corrected, operators.distinct_before
        );

        // Stage 5 and 6: categorical canonicalization
        let manufacturer_col: Vec<String> = clean.iter().map(|r| r.manufacturer.clone()).collect();
        let manufacturer_rewrite = self.manufacturer_rules.rewrite_column(&manufacturer_col);
        let manufacturers_matched = manufacturer_rewrite.matched;
        write_back(&mut clean, manufacturer_rewrite.values, |record, value| {
            record.manufacturer = value
        });

        let activity_col: Vec<String> = clean.iter().map(|r| r.activity.clone()).collect();
        let activity_rewrite = self.activity_rules.rewrite_column(&activity_col);
        let activities_matched = activity_rewrite.matched;
        write_back(&mut clean, activity_rewrite.values, |record, value| {
            record.activity = value
        });
        info!(
            "✅ Canonicalization: {} manufacturer and {} activity values matched a rule",
            manufacturers_matched, activities_matched
        );

        // Stage 7: long-tail bucketing over the whole table
        let manufacturer_col: Vec<String> = clean.iter().map(|r| r.manufacturer.clone()).collect();
        let manufacturer_bucket = self.manufacturer_bucketer.bucket(&manufacturer_col);
        write_back(&mut clean, manufacturer_bucket.values, |record, value| {
            record.manufacturer = value
        });

        let activity_col: Vec<String> = clean.iter().map(|r| r.activity.clone()).collect();
        let activity_bucket = self.activity_bucketer.bucket(&activity_col);
        write_back(&mut clean, activity_bucket.values, |record, value| {
            record.activity = value
        });
        info!(
            "✅ Bucketing: {} manufacturer and {} activity labels collapsed",
            manufacturer_bucket.collapsed_labels, activity_bucket.collapsed_labels
        );

        // Stage 8: model pass, scoped to one manufacturer's records
        let mut scoped_records = 0;
        let mut model_labels_collapsed = 0;
        if let Some(scope) = &self.model_scope {
            let indices: Vec<usize> = clean
                .iter()
                .enumerate()
                .filter(|(_, r)| r.manufacturer == scope.manufacturer)
                .map(|(i, _)| i)
                .collect();
            scoped_records = indices.len();

            if indices.is_empty() {
                debug!(
                    "No records left under manufacturer '{}'; model pass skipped",
                    scope.manufacturer
                );
            } else {
                let model_col: Vec<String> =
                    indices.iter().map(|&i| clean[i].model.clone()).collect();
                let model_rewrite = scope.rules.rewrite_column(&model_col);
                let model_bucket = scope.bucketer.bucket(&model_rewrite.values);
                model_labels_collapsed = model_bucket.collapsed_labels;
                for (&i, value) in indices.iter().zip(model_bucket.values) {
                    clean[i].model = value;
                }
                info!(
                    "✅ Models: {} '{}' records canonicalized, {} labels collapsed",
                    scoped_records, scope.manufacturer, model_labels_collapsed
                );
            }
        }

        let report = PipelineReport {
            today: self.classifier.today(),
            rows_in: validation.rows_in,
            invalid_ids: validation.invalid_ids,
            duplicates_removed: validation.duplicates_removed,
            missing_field_drops: assembly.missing_field,
            bad_date_drops: assembly.bad_date,
            unknown_use_drops: assembly.unknown_use,
            operator_names_corrected: operators.names_corrected,
            manufacturers_matched,
            activities_matched,
            manufacturer_labels_collapsed: manufacturer_bucket.collapsed_labels,
            activity_labels_collapsed: activity_bucket.collapsed_labels,
            scoped_records,
            model_labels_collapsed,
            rows_out: clean.len(),
        };

        counter!("sisant_rows_retained_total").increment(report.rows_out as u64);
        histogram!("sisant_pipeline_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            "🏁 Pipeline finished: {} of {} rows retained",
            report.rows_out, report.rows_in
        );

        Ok(CleanBatch {
            records: clean,
            report,
        })
    }

    /// Turns surviving raw rows into typed records: date and use-type
    /// parsing, tax-id decomposition, status derivation, and category
    /// normalization. Rows that cannot be typed are dropped and counted
    /// by reason.
    fn assemble(&self, records: Vec<RawRecord>) -> (Vec<CleanRecord>, AssemblyCounts) {
        let mut clean = Vec::with_capacity(records.len());
        let mut counts = AssemblyCounts::default();

        for record in records {
            if has_empty_required_field(&record) {
                debug!("Dropping {}: empty required field", record.aircraft_id);
                counts.missing_field += 1;
                continue;
            }

            let expiration_date =
                match NaiveDate::parse_from_str(record.expiration_date.trim(), "%d/%m/%Y") {
                    Ok(date) => date,
                    Err(_) => {
                        debug!(
                            "Dropping {}: unparseable expiration date '{}'",
                            record.aircraft_id, record.expiration_date
                        );
                        counts.bad_date += 1;
                        continue;
                    }
                };

            let type_of_use = match parse_type_of_use(&record.type_of_use) {
                Some(value) => value,
                None => {
                    debug!(
                        "Dropping {}: unknown use type '{}'",
                        record.aircraft_id, record.type_of_use
                    );
                    counts.unknown_use += 1;
                    continue;
                }
            };

            let (legal_entity, entity_number) = EntityResolver::split_tax_id(&record.tax_id);

            clean.push(CleanRecord {
                aircraft_id: record.aircraft_id,
                expiration_date,
                registration_date: StatusClassifier::registration_date(expiration_date),
                status: self.classifier.classify(expiration_date),
                operator_name: record.operator_name,
                legal_entity,
                entity_number,
                type_of_use,
                manufacturer: normalize_category(&record.manufacturer),
                model: normalize_category(&record.model),
                activity: normalize_category(&record.activity),
            });
        }

        (clean, counts)
    }
}

#[derive(Debug, Default)]
struct AssemblyCounts {
    missing_field: usize,
    bad_date: usize,
    unknown_use: usize,
}

/// The fields a typed record is built from. Serial number and takeoff
/// weight are not consumed downstream and may be empty.
fn has_empty_required_field(record: &RawRecord) -> bool {
    record.aircraft_id.trim().is_empty()
        || record.expiration_date.trim().is_empty()
        || record.operator_name.trim().is_empty()
        || record.tax_id.trim().is_empty()
        || record.type_of_use.trim().is_empty()
        || record.manufacturer.trim().is_empty()
        || record.model.trim().is_empty()
        || record.activity.trim().is_empty()
}

/// The registry writes use types in Portuguese; accept them with or
/// without their accents.
fn parse_type_of_use(raw: &str) -> Option<TypeOfUse> {
    match normalize_category(raw).as_str() {
        "básico" | "basico" => Some(TypeOfUse::Basic),
        "avançado" | "avancado" => Some(TypeOfUse::Advanced),
        _ => None,
    }
}

fn write_back<F>(records: &mut [CleanRecord], values: Vec<String>, mut assign: F)
where
    F: FnMut(&mut CleanRecord, String),
{
    for (record, value) in records.iter_mut().zip(values) {
        assign(record, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LegalEntity, RegistrationStatus};

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            today: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..PipelineConfig::default()
        }
    }

    fn create_test_row(aircraft_id: &str, expiration: &str, manufacturer: &str) -> RawRecord {
        RawRecord {
            aircraft_id: aircraft_id.to_string(),
            expiration_date: expiration.to_string(),
            operator_name: "Operator".to_string(),
            tax_id: "CPF:123.456.789-00".to_string(),
            type_of_use: "Básico".to_string(),
            manufacturer: manufacturer.to_string(),
            model: "Mavic 2".to_string(),
            serial_number: "SN".to_string(),
            max_takeoff_weight_kg: "0.8".to_string(),
            activity: "Recreativo".to_string(),
        }
    }

    #[test]
    fn test_parse_type_of_use() {
        assert_eq!(parse_type_of_use("Básico"), Some(TypeOfUse::Basic));
        assert_eq!(parse_type_of_use(" basico "), Some(TypeOfUse::Basic));
        assert_eq!(parse_type_of_use("AVANÇADO"), Some(TypeOfUse::Advanced));
        assert_eq!(parse_type_of_use("avancado"), Some(TypeOfUse::Advanced));
        assert_eq!(parse_type_of_use("recreativo"), None);
        assert_eq!(parse_type_of_use(""), None);
    }

    #[test]
    fn test_run_produces_typed_unique_records() {
        let pipeline = Pipeline::new(&test_config()).unwrap();
        let rows = vec![
            create_test_row("PR-000000001", "01/06/2024", "DJI"),
            create_test_row("PP-000000002", "01/09/2023", "Parrot Inc"),
            create_test_row("bad id", "01/06/2024", "DJI"),
        ];

        let batch = pipeline.run(rows).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.report.invalid_ids, 1);
        assert_eq!(batch.report.rows_out, 2);

        let by_id = batch.by_aircraft_id();
        assert_eq!(by_id.len(), 2);
        assert_eq!(by_id["PR-000000001"].status, RegistrationStatus::Ok);
        assert_eq!(by_id["PR-000000001"].manufacturer, "dji");
        assert_eq!(by_id["PP-000000002"].status, RegistrationStatus::Renew);
        assert_eq!(by_id["PR-000000001"].legal_entity, LegalEntity::Individual);
    }

    #[test]
    fn test_assembly_drops_are_counted_by_reason() {
        let pipeline = Pipeline::new(&test_config()).unwrap();

        let mut missing = create_test_row("PR-000000001", "01/06/2024", "DJI");
        missing.activity = "".to_string();
        let bad_date = create_test_row("PP-000000002", "2024-06-01", "DJI");
        let mut bad_use = create_test_row("PS-000000003", "01/06/2024", "DJI");
        bad_use.type_of_use = "???".to_string();
        let good = create_test_row("PR-000000004", "01/06/2024", "DJI");

        let batch = pipeline.run(vec![missing, bad_date, bad_use, good]).unwrap();
        assert_eq!(batch.report.missing_field_drops, 1);
        assert_eq!(batch.report.bad_date_drops, 1);
        assert_eq!(batch.report.unknown_use_drops, 1);
        assert_eq!(batch.report.rows_out, 1);
    }

    #[test]
    fn test_assembly_zero_survivors_is_fatal() {
        let pipeline = Pipeline::new(&test_config()).unwrap();
        let rows = vec![create_test_row("PR-000000001", "junk", "DJI")];

        let err = pipeline.run(rows).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ZeroSurvivors {
                stage: "assembly",
                ..
            }
        ));
    }

    #[test]
    fn test_run_is_deterministic() {
        let pipeline = Pipeline::new(&test_config()).unwrap();
        let rows = || {
            vec![
                create_test_row("PR-000000001", "01/06/2024", "DJI"),
                create_test_row("PP-000000002", "01/06/2023", "Visuo"),
                create_test_row("PS-000000003", "01/01/2020", "dji "),
            ]
        };

        let first = pipeline.run(rows()).unwrap();
        let second = pipeline.run(rows()).unwrap();
        assert_eq!(first.records, second.records);
    }

    #[test]
    fn test_scoped_model_pass_only_touches_the_scope() {
        let pipeline = Pipeline::new(&test_config()).unwrap();
        let mut dji = create_test_row("PR-000000001", "01/06/2024", "DJI");
        dji.model = "DJI Mavic 2 Pro".to_string();
        let mut parrot = create_test_row("PP-000000002", "01/06/2024", "Parrot");
        parrot.model = "Anafi Thermal".to_string();

        let batch = pipeline.run(vec![dji, parrot]).unwrap();
        let by_id = batch.by_aircraft_id();

        assert_eq!(by_id["PR-000000001"].model, "mavic");
        // Outside the scope the model is only normalized
        assert_eq!(by_id["PP-000000002"].model, "anafithermal");
        assert_eq!(batch.report.scoped_records, 1);
    }
}
