use serde::{Deserialize, Serialize};

/// Commercial priority tier assigned to a customer from its RFM score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hero,
    Growth,
    Manter,
    Risco,
}

impl Tier {
    /// Returns the wire/report label for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hero => "hero",
            Tier::Growth => "growth",
            Tier::Manter => "manter",
            Tier::Risco => "risco",
        }
    }
}

/// The R.I.C.O. alert families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Ruptura,
    QuedaBrusca,
    OutlierVolume,
    Inatividade,
    Crescimento,
    Oportunidade,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Ruptura => "ruptura",
            AlertKind::QuedaBrusca => "queda_brusca",
            AlertKind::OutlierVolume => "outlier_volume",
            AlertKind::Inatividade => "inatividade",
            AlertKind::Crescimento => "crescimento",
            AlertKind::Oportunidade => "oportunidade",
        }
    }
}

/// Ordinal confidence classification attached to each alert.
///
/// Variants are ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    Low,
    Medium,
    High,
}

impl Reliability {
    /// Classifies a confidence score in `[0, 1]` into a reliability tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            Reliability::High
        } else if score >= 0.4 {
            Reliability::Medium
        } else {
            Reliability::Low
        }
    }

    /// The colored marker used when rendering alerts for humans.
    pub fn marker(&self) -> &'static str {
        match self {
            Reliability::High => "🔴",
            Reliability::Medium => "🟡",
            Reliability::Low => "🔵",
        }
    }
}
