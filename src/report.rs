// Read-only aggregate views over a clean batch, for whatever renders
// them downstream. Nothing here mutates records.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::domain::{CleanRecord, LegalEntity, RegistrationStatus, TypeOfUse};

/// One label with its count and share of the batch.
#[derive(Debug, Clone, Serialize)]
pub struct ShareRow {
    pub label: String,
    pub count: usize,
    /// Fraction of the batch, 0.0 to 1.0
    pub share: f64,
}

/// Registrations made during one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCount {
    /// First day of the month
    pub month: NaiveDate,
    pub count: usize,
}

/// One activity split by the legal entity of its operators.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntityRow {
    pub activity: String,
    pub individual: usize,
    pub company: usize,
}

/// One manufacturer split by the legal entity of its operators.
#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerEntityRow {
    pub manufacturer: String,
    pub individual: usize,
    pub company: usize,
}

/// Everything the summary view needs, computed in one pass over the
/// batch per table.
#[derive(Debug, Serialize)]
pub struct RegistrySummary {
    pub total_records: usize,
    pub status: Vec<ShareRow>,
    pub type_of_use: Vec<ShareRow>,
    pub monthly_registrations: Vec<MonthlyCount>,
    pub activity_by_legal_entity: Vec<ActivityEntityRow>,
    pub manufacturers: Vec<ShareRow>,
    pub manufacturer_by_legal_entity: Vec<ManufacturerEntityRow>,
    /// Model distribution inside the scoped manufacturer, empty when no
    /// scope was configured
    pub models_in_scope: Vec<ShareRow>,
}

impl RegistrySummary {
    pub fn from_records(records: &[CleanRecord], model_scope: Option<&str>) -> Self {
        Self {
            total_records: records.len(),
            status: status_breakdown(records),
            type_of_use: type_of_use_breakdown(records),
            monthly_registrations: monthly_registrations(records),
            activity_by_legal_entity: activity_by_legal_entity(records),
            manufacturers: manufacturer_ranking(records),
            manufacturer_by_legal_entity: manufacturer_by_legal_entity(records),
            models_in_scope: model_scope
                .map(|scope| model_ranking(records, scope))
                .unwrap_or_default(),
        }
    }
}

/// Status counts in lifecycle order.
pub fn status_breakdown(records: &[CleanRecord]) -> Vec<ShareRow> {
    let statuses = [
        RegistrationStatus::Ok,
        RegistrationStatus::Renew,
        RegistrationStatus::Inactive,
    ];
    statuses
        .iter()
        .map(|status| {
            let count = records.iter().filter(|r| r.status == *status).count();
            share_row(status.as_str(), count, records.len())
        })
        .collect()
}

pub fn type_of_use_breakdown(records: &[CleanRecord]) -> Vec<ShareRow> {
    let uses = [TypeOfUse::Basic, TypeOfUse::Advanced];
    uses.iter()
        .map(|use_type| {
            let count = records.iter().filter(|r| r.type_of_use == *use_type).count();
            share_row(use_type.as_str(), count, records.len())
        })
        .collect()
}

/// Registrations per calendar month of the registration date, sorted
/// chronologically.
pub fn monthly_registrations(records: &[CleanRecord]) -> Vec<MonthlyCount> {
    let mut by_month: HashMap<NaiveDate, usize> = HashMap::new();
    for record in records {
        let date = record.registration_date;
        if let Some(month) = NaiveDate::from_ymd_opt(date.year(), date.month(), 1) {
            *by_month.entry(month).or_insert(0) += 1;
        }
    }

    let mut months: Vec<MonthlyCount> = by_month
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect();
    months.sort_by_key(|m| m.month);
    months
}

/// Cross-tabulation of activities against the operator's legal entity,
/// busiest activities first.
pub fn activity_by_legal_entity(records: &[CleanRecord]) -> Vec<ActivityEntityRow> {
    entity_split(records.iter().map(|r| (r.activity.as_str(), r.legal_entity)))
        .into_iter()
        .map(|(activity, individual, company)| ActivityEntityRow {
            activity,
            individual,
            company,
        })
        .collect()
}

/// Cross-tabulation of manufacturers against the operator's legal
/// entity: which brands individuals and companies register.
pub fn manufacturer_by_legal_entity(records: &[CleanRecord]) -> Vec<ManufacturerEntityRow> {
    entity_split(
        records
            .iter()
            .map(|r| (r.manufacturer.as_str(), r.legal_entity)),
    )
    .into_iter()
    .map(|(manufacturer, individual, company)| ManufacturerEntityRow {
        manufacturer,
        individual,
        company,
    })
    .collect()
}

/// Per-label (individual, company) counts, busiest labels first with
/// ties falling to label order.
fn entity_split<'a, I>(pairs: I) -> Vec<(String, usize, usize)>
where
    I: Iterator<Item = (&'a str, LegalEntity)>,
{
    let mut by_label: HashMap<&str, (usize, usize)> = HashMap::new();
    for (label, legal_entity) in pairs {
        let entry = by_label.entry(label).or_insert((0, 0));
        match legal_entity {
            LegalEntity::Individual => entry.0 += 1,
            LegalEntity::Company => entry.1 += 1,
        }
    }

    let mut rows: Vec<(String, usize, usize)> = by_label
        .into_iter()
        .map(|(label, (individual, company))| (label.to_string(), individual, company))
        .collect();
    rows.sort_by(|a, b| {
        let total_a = a.1 + a.2;
        let total_b = b.1 + b.2;
        total_b.cmp(&total_a).then_with(|| a.0.cmp(&b.0))
    });
    rows
}

/// Manufacturer frequencies over the whole batch, ranked the same way
/// the bucketer ranks: count descending, label ascending.
pub fn manufacturer_ranking(records: &[CleanRecord]) -> Vec<ShareRow> {
    ranked_shares(records.iter().map(|r| r.manufacturer.as_str()))
}

/// Model frequencies inside one manufacturer's records.
pub fn model_ranking(records: &[CleanRecord], manufacturer: &str) -> Vec<ShareRow> {
    ranked_shares(
        records
            .iter()
            .filter(|r| r.manufacturer == manufacturer)
            .map(|r| r.model.as_str()),
    )
}

fn ranked_shares<'a, I>(values: I) -> Vec<ShareRow>
where
    I: Iterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0;
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
        total += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .map(|(label, count)| share_row(label, count, total))
        .collect()
}

fn share_row(label: &str, count: usize, total: usize) -> ShareRow {
    let share = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    };
    ShareRow {
        label: label.to_string(),
        count,
        share,
    }
}
