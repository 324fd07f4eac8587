use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("CSV decoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern for label '{label}': {source}")]
    Rule {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("Duplicate canonical label '{0}' in rule list")]
    DuplicateLabel(String),

    #[error("Missing column in registry header: {0}")]
    MissingColumn(String),

    #[error("No records survived the {stage} stage ({rows_in} rows in)")]
    ZeroSurvivors { stage: &'static str, rows_in: usize },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
