//! The diagnostic handed back for one scored profile.
//!
//! Nothing here is persisted by the engine itself; a `DiagnosticResult` is built
//! per request and serialised by whoever stores or prints it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AnalysisInput, SimilarityConfig};
use crate::math::MinMax;
use crate::models::SnapshotOrigin;

/// Discrete coherence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticBand {
    FullyAligned,
    BroadlyCoherent,
    MildMismatch,
    Atypical,
}

impl DiagnosticBand {
    /// Thresholds are strict: exactly 0.9 is "broadly coherent".
    pub fn from_score(score: f64) -> Self {
        if score > 0.9 {
            DiagnosticBand::FullyAligned
        } else if score > 0.7 {
            DiagnosticBand::BroadlyCoherent
        } else if score > 0.4 {
            DiagnosticBand::MildMismatch
        } else {
            DiagnosticBand::Atypical
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DiagnosticBand::FullyAligned => "Fully aligned",
            DiagnosticBand::BroadlyCoherent => "Broadly coherent",
            DiagnosticBand::MildMismatch => "Mild mismatch",
            DiagnosticBand::Atypical => "Atypical",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            DiagnosticBand::FullyAligned => "👌",
            DiagnosticBand::BroadlyCoherent => "✅",
            DiagnosticBand::MildMismatch => "🤔",
            DiagnosticBand::Atypical => "🔎",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DiagnosticBand::FullyAligned => "Your salary is fully consistent with your background.",
            DiagnosticBand::BroadlyCoherent => "Your salary is broadly consistent with your background.",
            DiagnosticBand::MildMismatch => "Your salary seems a little off compared to your profile.",
            DiagnosticBand::Atypical => "Your salary is very atypical for your profile.",
        }
    }
}

/// Where a compensation sits inside the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankLabel {
    Top10,
    Top25,
    UpperMid,
    LowerMid,
    BottomBand,
}

impl RankLabel {
    pub fn from_percentile(percentile: u32) -> Self {
        match percentile {
            p if p >= 90 => RankLabel::Top10,
            p if p >= 75 => RankLabel::Top25,
            p if p >= 50 => RankLabel::UpperMid,
            p if p >= 25 => RankLabel::LowerMid,
            _ => RankLabel::BottomBand,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            RankLabel::Top10 => "top 10%",
            RankLabel::Top25 => "top 25%",
            RankLabel::UpperMid => "upper-mid",
            RankLabel::LowerMid => "lower-mid",
            RankLabel::BottomBand => "bottom band",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub band: DiagnosticBand,
    pub title: String,
    pub icon: String,
    pub description: String,
}

impl From<DiagnosticBand> for DiagnosticSummary {
    fn from(band: DiagnosticBand) -> Self {
        Self {
            band,
            title: format!("{} {}", band.title(), band.icon()),
            icon: band.icon().to_string(),
            description: band.description().to_string(),
        }
    }
}

/// Predicted vs declared compensation, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedGap {
    pub predicted: f64,
    pub actual: f64,
    /// `actual - predicted`.
    pub difference: f64,
    /// Difference relative to the prediction, in percent (one decimal).
    pub percentage: f64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPosition {
    /// Percentile rank of the declared compensation in the population.
    pub percentile: u32,
    pub rank_label: RankLabel,
    /// Share of peers whose similarity is at or below the near threshold.
    pub similar_percentage: u32,
    pub comparison: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Descriptive statistics of the population's similarity distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub quartiles: [f64; 3],
    pub percentiles: Percentiles,
    pub near_count: usize,
    pub far_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Human label such as `0.3–0.4`.
    pub range: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// One point of a per-experience-year series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpPoint {
    /// Whole years of experience (truncated).
    pub xp: i64,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub average_by_xp: Vec<XpPoint>,
    pub median_by_xp: Vec<XpPoint>,
    pub histogram: Vec<HistogramBucket>,
}

/// What the scoring snapshot looked like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub snapshot_version: u64,
    pub origin: SnapshotOrigin,
    pub locations: Vec<String>,
    pub xp_range: MinMax,
    pub output_range: MinMax,
}

/// Full diagnostic for one scored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub diagnostic: DiagnosticSummary,
    pub estimated_gap: EstimatedGap,
    pub salary_position: SalaryPosition,
    pub similarity_config: SimilarityConfig,
    pub coherence_score: f64,
    pub predicted_compensation: f64,
    pub actual_compensation: f64,
    pub similarity: SimilarityStats,
    pub chart_data: ChartData,
    pub meta: SnapshotMeta,
}

/// A diagnostic stored by the analysis sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub input: AnalysisInput,
    pub output: DiagnosticResult,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_thresholds_are_strict() {
        assert_eq!(DiagnosticBand::from_score(0.95), DiagnosticBand::FullyAligned);
        assert_eq!(DiagnosticBand::from_score(0.9), DiagnosticBand::BroadlyCoherent);
        assert_eq!(DiagnosticBand::from_score(0.7), DiagnosticBand::MildMismatch);
        assert_eq!(DiagnosticBand::from_score(0.41), DiagnosticBand::MildMismatch);
        assert_eq!(DiagnosticBand::from_score(0.4), DiagnosticBand::Atypical);
        assert_eq!(DiagnosticBand::from_score(0.0), DiagnosticBand::Atypical);
    }

    #[test]
    fn rank_labels_are_inclusive() {
        assert_eq!(RankLabel::from_percentile(90), RankLabel::Top10);
        assert_eq!(RankLabel::from_percentile(89), RankLabel::Top25);
        assert_eq!(RankLabel::from_percentile(75), RankLabel::Top25);
        assert_eq!(RankLabel::from_percentile(50), RankLabel::UpperMid);
        assert_eq!(RankLabel::from_percentile(25), RankLabel::LowerMid);
        assert_eq!(RankLabel::from_percentile(24), RankLabel::BottomBand);
    }

    #[test]
    fn summary_title_carries_icon() {
        let s = DiagnosticSummary::from(DiagnosticBand::MildMismatch);
        assert_eq!(s.title, "Mild mismatch 🤔");
        assert_eq!(s.band, DiagnosticBand::MildMismatch);
    }
}
