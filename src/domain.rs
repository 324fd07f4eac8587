use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the registry export exactly as published. Every field is
/// kept as opaque text; nothing has been validated yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub aircraft_id: String,
    pub expiration_date: String,
    pub operator_name: String,
    pub tax_id: String,
    pub type_of_use: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub max_takeoff_weight_kg: String,
    pub activity: String,
}

/// A validated, canonicalized registration. Batches of these are
/// read-only for consumers once the pipeline hands them over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub aircraft_id: String,
    pub expiration_date: NaiveDate,
    pub registration_date: NaiveDate,
    pub status: RegistrationStatus,
    pub operator_name: String,
    pub legal_entity: LegalEntity,
    pub entity_number: String,
    pub type_of_use: TypeOfUse,
    pub manufacturer: String,
    pub model: String,
    pub activity: String,
}

/// Lifecycle state of a registration relative to the run's reference date.
///
/// Derived fresh on every run; a persisted status is stale the day after
/// it was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Registration is current
    Ok,
    /// Expired, still inside the six-month renewal window
    Renew,
    /// Expired more than six months ago and no longer renewable
    Inactive,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Ok => "ok",
            RegistrationStatus::Renew => "renew",
            RegistrationStatus::Inactive => "inactive",
        }
    }
}

/// Whether the operator registered under an individual (CPF) or a
/// company (CNPJ) tax number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalEntity {
    Individual,
    Company,
}

impl LegalEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalEntity::Individual => "individual",
            LegalEntity::Company => "company",
        }
    }
}

/// Operational scope declared at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOfUse {
    /// Recreational aircraft or class 3 RPA within visual line of sight
    Basic,
    /// Class 2 and remaining class 3 RPA
    Advanced,
}

impl TypeOfUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeOfUse::Basic => "basic",
            TypeOfUse::Advanced => "advanced",
        }
    }
}
