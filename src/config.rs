use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One canonicalization rule: normalized values matching `pattern`
/// (substring search) are rewritten to `label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub label: String,
    pub pattern: String,
}

/// Model canonicalization is restricted to the records of a single
/// manufacturer; everything outside the scope keeps its normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScope {
    /// Canonical manufacturer label the model pass applies to
    pub manufacturer: String,
    /// Ordered model rules, later rules taking precedence
    pub rules: Vec<RuleSpec>,
    /// Distinct model labels kept before the long tail collapses
    pub keep_top: usize,
}

/// Full pipeline configuration. The compiled-in defaults reproduce the
/// SISANT registry vocabularies; a TOML file may override any subset of
/// the fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reference date for status derivation as an ISO string
    /// ("2024-01-01"); the current date when absent.
    pub today: Option<NaiveDate>,
    /// Ordered manufacturer rules, later rules taking precedence
    pub manufacturer_rules: Vec<RuleSpec>,
    /// Ordered declared-activity rules, later rules taking precedence
    pub activity_rules: Vec<RuleSpec>,
    /// Distinct manufacturer labels kept before the long tail collapses
    pub manufacturer_keep_top: usize,
    /// Distinct activity labels kept before the long tail collapses
    pub activity_keep_top: usize,
    /// Scoped model canonicalization; skipped entirely when absent
    pub model_scope: Option<ModelScope>,
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            today: None,
            manufacturer_rules: default_manufacturer_rules(),
            activity_rules: default_activity_rules(),
            manufacturer_keep_top: 8,
            activity_keep_top: 8,
            model_scope: Some(ModelScope {
                manufacturer: "dji".to_string(),
                rules: default_dji_model_rules(),
                keep_top: 14,
            }),
        }
    }
}

fn rule(label: &str, pattern: &str) -> RuleSpec {
    RuleSpec {
        label: label.to_string(),
        pattern: pattern.to_string(),
    }
}

/// Manufacturer synonyms observed in the registry. Later rules take
/// precedence, so the broad "custom" self-built pattern sits behind the
/// brand rules it overlaps: a self-built drone mentioning dji parts
/// still lands on "custom".
fn default_manufacturer_rules() -> Vec<RuleSpec> {
    vec![
        rule("zll", "zll|sg906"),
        rule("xmobots", "xmobots"),
        rule("xiaomi", "xiaomi|fimi|xiomi"),
        rule("x-fly", "xfly|x-fly"),
        rule("visuo", "visuo"),
        rule("sjrc", "sjrc|srjc"),
        rule("shantou", "shantou"),
        rule("sensefly", "sensefly"),
        rule("santiago&cintra", "santiago|cintra"),
        rule("phoenixmodel", "phoenix"),
        rule("parrot", "parrot"),
        rule("others", "outro"),
        rule("nuvemuav", "nuvem"),
        rule("hubsan", "hubsan|hubsen"),
        rule("horus", "horus"),
        rule("highgreat", "highgreat"),
        rule("geprc", "gepr"),
        rule("flyingcircus", "circus"),
        rule("dji", "dji|mavic|phanton|phantom"),
        rule(
            "custom",
            "fabrica|aeromodelo|propria|própria|proprio|próprio|caseiro|montado|artesanal|constru",
        ),
        rule("c-fly", "cfly|c-fly"),
        rule("autelrobotics", "autel"),
    ]
}

/// Declared-activity groupings observed in the registry. A free-text
/// entry naming several activities lands on whichever matching rule
/// sits last.
fn default_activity_rules() -> Vec<RuleSpec> {
    vec![
        rule(
            "segurança",
            "seguran|fiscaliza|reporta|vigi|policia|bombeiro|defesa|combate|emergencia|infraestrutura",
        ),
        rule(
            "publicidade",
            "publicid|letreir|show|marketing|demonstr|eventos|comercial",
        ),
        rule("logística", "transport|carga|delivery"),
        rule(
            "foto&cinem",
            "fotografia|cinema|inspe|vídeo|video|fotos|jornal|filma|maker|audit|monit|perícia|audiovisu|vistoria|imagens|turismo|youtube|imobili|imóveis",
        ),
        rule(
            "engenharia",
            "pulveriz|aeroagr|agricultura|levantamento|fotograme|prospec|topografia|minera|capta|avalia|mapea|geoproc|engenharia|energia|solar|ambiental|constru|obras|industria|arquitetura|meioambiente",
        ),
        rule("educação", "treinamento|educa|ensin|pesquis"),
    ]
}

/// DJI model synonyms. The bare "dji" catch-all sits first so every
/// family rule after it wins under last-match precedence, and the big
/// families sit last: "mavic mini" is a mavic, not a mini.
fn default_dji_model_rules() -> Vec<RuleSpec> {
    vec![
        rule("others", "dji"),
        rule("fpv", "fpv"),
        rule("agras", "agras|mg-1p|mg1p|t16|t10|t40|3wwdz"),
        rule("tello", "tello|tlw004"),
        rule("inspire", "inspire"),
        rule("avata", "avata|qf2w4k"),
        rule("matrice", "matrice|m300"),
        rule("spark", "spa|mm1a"),
        rule("mini", "min|mt2pd|mt2ss5|djimi|mt3m3vd"),
        rule("phantom", "phan|wm331a|p4p|w322b|p4mult|w323|wm332a|hanto"),
        rule(
            "mavic",
            "mav|air|ma2ue3w|m1p|da2sue1|1ss5|u11x|rc231|m2e|l1p|enterprisedual",
        ),
    ]
}
