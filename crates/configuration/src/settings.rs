use crate::error::ConfigError;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Analysis constants shared by the metrics and insights engines.
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// RFM score thresholds mapping customers into tiers.
    #[serde(default)]
    pub tiers: TierThresholds,
    /// Weights of the PDV behavior-vector score.
    #[serde(default)]
    pub segmentation: SegmentationWeights,
}

/// Constants consumed by the metrics and insights engines.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    /// Days added to the median turnover when projecting the next
    /// replenishment window.
    pub logistics_delay_days: i64,
    /// Window used by the repurchase-probability primitive.
    pub repurchase_window_days: i64,
    /// Absolute Z-score above which a volume observation is an outlier.
    pub outlier_z_threshold: f64,
    /// Per-SKU revenue quantile at or above which a SKU is part of the hero mix.
    pub hero_revenue_percentile: f64,
}

/// RFM score cut-offs. A score at or above a threshold lands in that tier;
/// anything below `manter` is `risco`.
#[derive(Debug, Clone, Deserialize)]
pub struct TierThresholds {
    pub hero: f64,
    pub growth: f64,
    pub manter: f64,
}

/// Weights of the PDV behavior-vector components. Should sum to 1.0.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationWeights {
    pub mix: f64,
    pub volume: f64,
    pub frequency: f64,
}

// --- Default Implementations ---
// These carry the canonical analysis constants, so a radar.toml file is only
// needed to override them.

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            logistics_delay_days: 20,
            repurchase_window_days: 90,
            outlier_z_threshold: 3.0,
            hero_revenue_percentile: 0.8,
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            hero: 0.85,
            growth: 0.65,
            manter: 0.45,
        }
    }
}

impl Default for SegmentationWeights {
    fn default() -> Self {
        Self {
            mix: 0.35,
            volume: 0.35,
            frequency: 0.30,
        }
    }
}

impl Settings {
    /// Checks that the loaded values are logically usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.logistics_delay_days < 0 {
            return Err(ConfigError::ValidationError(
                "analysis.logistics_delay_days must be non-negative".to_string(),
            ));
        }
        if self.analysis.repurchase_window_days <= 0 {
            return Err(ConfigError::ValidationError(
                "analysis.repurchase_window_days must be positive".to_string(),
            ));
        }
        if self.analysis.outlier_z_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(
                "analysis.outlier_z_threshold must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analysis.hero_revenue_percentile) {
            return Err(ConfigError::ValidationError(
                "analysis.hero_revenue_percentile must be within [0, 1]".to_string(),
            ));
        }
        if !(self.tiers.hero > self.tiers.growth && self.tiers.growth > self.tiers.manter) {
            return Err(ConfigError::ValidationError(
                "tiers must be strictly ordered: hero > growth > manter".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_canonical_constants() {
        let settings = Settings::default();
        assert_eq!(settings.analysis.logistics_delay_days, 20);
        assert_eq!(settings.analysis.repurchase_window_days, 90);
        assert_eq!(settings.analysis.outlier_z_threshold, 3.0);
        assert_eq!(settings.analysis.hero_revenue_percentile, 0.8);
        assert_eq!(settings.tiers.hero, 0.85);
        assert_eq!(settings.tiers.growth, 0.65);
        assert_eq!(settings.tiers.manter, 0.45);
        assert_eq!(settings.segmentation.mix, 0.35);
        assert_eq!(settings.segmentation.volume, 0.35);
        assert_eq!(settings.segmentation.frequency, 0.30);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn unordered_tiers_fail_validation() {
        let mut settings = Settings::default();
        settings.tiers.growth = 0.9;
        assert!(settings.validate().is_err());
    }
}
