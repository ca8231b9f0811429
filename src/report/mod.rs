//! Reporting utilities: peer scores, the diagnostic assembler and summaries.
//!
//! The assembler is pure: it takes a target profile, the population and the
//! snapshot to score with, and returns a `DiagnosticResult`. Recording the
//! request and storing the result are the engine's business.

pub mod format;

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::{
    ChartData, CompensationRecord, DiagnosticBand, DiagnosticResult, DiagnosticSummary, EstimatedGap,
    HistogramBucket, Percentiles, Profile, RankLabel, SalaryPosition, ScoreRecord, ScoreSummary,
    SimilarityConfig, SimilarityStats, XpPoint,
};
use crate::math::stats;
use crate::models::ModelSnapshot;
use crate::similarity::{aligned_similarity, coherence_score, feature_similarity};

/// How one population member compares with the target.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerScore {
    pub record: CompensationRecord,
    /// Closeness in `(location, xp)` feature space.
    pub feature_similarity: f64,
    /// Closeness of the member's pay to the target's predicted pay.
    pub aligned_similarity: f64,
}

/// Score every population member against `target` (in parallel).
pub fn peer_scores(
    target: &Profile,
    population: &[CompensationRecord],
    snapshot: &ModelSnapshot,
    config: &SimilarityConfig,
) -> Vec<PeerScore> {
    let predicted = snapshot.predict(&target.location, target.years_xp);
    let vocab = snapshot.vocabulary();
    let target_key = (target.location.as_str(), target.xp());

    population
        .par_iter()
        .map(|r| PeerScore {
            record: r.clone(),
            feature_similarity: feature_similarity(vocab, target_key, (r.location.as_str(), r.xp()), config),
            aligned_similarity: aligned_similarity(r.compensation, predicted),
        })
        .collect()
}

/// The `top_n` members closest to the target in feature space.
pub fn closest_peers(scores: &[PeerScore], top_n: usize) -> Vec<PeerScore> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| {
        b.feature_similarity
            .partial_cmp(&a.feature_similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

/// Build the full diagnostic for `target` against `population`.
pub fn assemble_diagnostic(
    target: &Profile,
    population: &[CompensationRecord],
    snapshot: &ModelSnapshot,
    config: &SimilarityConfig,
) -> DiagnosticResult {
    let peers = peer_scores(target, population, snapshot, config);
    diagnostic_from_peers(target, population, &peers, snapshot, config)
}

/// Same as [`assemble_diagnostic`] with `peers` already scored against
/// `population`.
pub fn diagnostic_from_peers(
    target: &Profile,
    population: &[CompensationRecord],
    peers: &[PeerScore],
    snapshot: &ModelSnapshot,
    config: &SimilarityConfig,
) -> DiagnosticResult {
    let scores: Vec<f64> = peers.iter().map(|p| p.aligned_similarity).collect();

    let predicted = snapshot.predict(&target.location, target.years_xp);
    let actual = target.compensation;
    let coherence = coherence_score(actual, predicted);

    let similarity = similarity_stats(&scores, config.near_threshold);

    let compensations: Vec<f64> = population.iter().map(|r| r.compensation).collect();
    let percentile = stats::percentile_rank(&compensations, actual);
    let similar_percentage =
        ((similarity.far_count as f64 / similarity.count.max(1) as f64) * 100.0).round() as u32;

    let band = DiagnosticBand::from_score(coherence);
    let (average_by_xp, median_by_xp) = series_by_xp(population);

    DiagnosticResult {
        diagnostic: DiagnosticSummary::from(band),
        estimated_gap: estimated_gap(predicted, actual),
        salary_position: SalaryPosition {
            percentile,
            rank_label: RankLabel::from_percentile(percentile),
            similar_percentage,
            comparison: format!(
                "Among profiles close to yours (location & experience), you earn more than {similar_percentage}% of them."
            ),
        },
        similarity_config: *config,
        coherence_score: coherence,
        predicted_compensation: predicted,
        actual_compensation: actual,
        similarity,
        chart_data: ChartData {
            average_by_xp,
            median_by_xp,
            histogram: histogram(&scores, config.histogram_bins),
        },
        meta: snapshot.meta(),
    }
}

/// Descriptive statistics over a similarity distribution.
///
/// Scores strictly above `near_threshold` count as near.
pub fn similarity_stats(scores: &[f64], near_threshold: f64) -> SimilarityStats {
    let mean = stats::mean(scores);
    let (min, max) = stats::min_max(scores);
    let [p10, p25, p50, p75, p90] = stats::common_percentiles(scores);
    let near_count = scores.iter().filter(|&&s| s > near_threshold).count();

    SimilarityStats {
        count: scores.len(),
        mean,
        std_dev: stats::std_dev(scores, mean),
        median: stats::median(scores),
        min,
        max,
        quartiles: stats::quartiles(scores),
        percentiles: Percentiles { p10, p25, p50, p75, p90 },
        near_count,
        far_count: scores.len() - near_count,
    }
}

pub fn estimated_gap(predicted: f64, actual: f64) -> EstimatedGap {
    let percentage = ((actual - predicted) / predicted.max(1.0) * 100.0 * 10.0).round() / 10.0;
    let comment = if actual > predicted {
        "You earn more than what is estimated for your profile."
    } else if actual < predicted {
        "You earn less than what is estimated for your profile."
    } else {
        "You earn exactly what is expected."
    };

    EstimatedGap {
        predicted: predicted.round(),
        actual: actual.round(),
        difference: (actual - predicted).round(),
        percentage,
        comment: comment.to_string(),
    }
}

/// Equal-width buckets over `[0, 1]` with `0.0–0.1` style labels.
pub fn histogram(scores: &[f64], bins: usize) -> Vec<HistogramBucket> {
    let counts = stats::histogram_counts(scores, bins);
    let n = counts.len() as f64;
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = i as f64 / n;
            let upper = (i + 1) as f64 / n;
            HistogramBucket {
                range: format!("{lower:.1}–{upper:.1}"),
                lower,
                upper,
                count,
            }
        })
        .collect()
}

/// Average and median compensation per whole year of experience, rounded.
///
/// Missing experience counts as year 0. Both series are sorted by year.
pub fn series_by_xp(population: &[CompensationRecord]) -> (Vec<XpPoint>, Vec<XpPoint>) {
    let mut grouped: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for r in population {
        grouped.entry(r.xp().floor() as i64).or_default().push(r.compensation);
    }

    let average = grouped
        .iter()
        .map(|(&xp, comps)| XpPoint {
            xp,
            value: stats::mean(comps).round(),
            count: comps.len(),
        })
        .collect();
    let median = grouped
        .iter()
        .map(|(&xp, comps)| XpPoint {
            xp,
            value: stats::median(comps).round(),
            count: comps.len(),
        })
        .collect();
    (average, median)
}

/// Global figures over every recorded scoring request.
pub fn summarize_scores(records: &[ScoreRecord]) -> ScoreSummary {
    let compensations: Vec<f64> = records.iter().map(|r| r.compensation).collect();
    let mut users: Vec<&str> = records
        .iter()
        .filter_map(|r| r.identity_token.as_deref())
        .filter(|t| !t.is_empty())
        .collect();
    users.sort_unstable();
    users.dedup();

    ScoreSummary {
        number_of_scores: records.len(),
        average_compensation: stats::mean(&compensations),
        median_compensation: stats::median(&compensations),
        number_of_users: users.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrainingConfig;
    use crate::fit::fit_snapshot;

    fn snapshot(records: &[CompensationRecord]) -> ModelSnapshot {
        let config = TrainingConfig {
            seed: Some(3),
            max_epochs: 20,
            ..TrainingConfig::default()
        };
        fit_snapshot(records, &config, None)
    }

    fn population() -> Vec<CompensationRecord> {
        (0..20)
            .map(|i| {
                let loc = if i % 2 == 0 { "Paris" } else { "Lyon" };
                let xp = (i / 2) as f64 + 0.5;
                CompensationRecord::new(loc, Some(xp), 40_000.0 + 1_000.0 * i as f64)
            })
            .collect()
    }

    #[test]
    fn histogram_labels_and_last_bucket() {
        let h = histogram(&[0.0, 0.05, 0.5, 1.0, 1.0], 10);
        assert_eq!(h.len(), 10);
        assert_eq!(h[0].range, "0.0–0.1");
        assert_eq!(h[9].range, "0.9–1.0");
        assert_eq!(h[0].count, 2);
        assert_eq!(h[5].count, 1);
        assert_eq!(h[9].count, 2);
    }

    #[test]
    fn gap_is_rounded_and_relative_to_prediction() {
        let g = estimated_gap(40_000.4, 50_000.0);
        assert_eq!(g.predicted, 40_000.0);
        assert_eq!(g.difference, 10_000.0);
        assert_eq!(g.percentage, 25.0);
        assert!(g.comment.contains("more"));

        let g = estimated_gap(0.2, 0.0);
        assert_eq!(g.percentage, -20.0);
        assert!(g.comment.contains("less"));
        assert!(estimated_gap(10.0, 10.0).comment.contains("exactly"));
    }

    #[test]
    fn xp_series_truncate_years_and_sort() {
        let pop = vec![
            CompensationRecord::new("A", Some(2.9), 30_000.0),
            CompensationRecord::new("A", Some(2.1), 40_000.0),
            CompensationRecord::new("A", Some(2.5), 41_000.0),
            CompensationRecord::new("A", None, 10_000.0),
        ];
        let (avg, med) = series_by_xp(&pop);
        assert_eq!(avg.iter().map(|p| p.xp).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(avg[1].value, 37_000.0);
        assert_eq!(avg[1].count, 3);
        assert_eq!(med[1].value, 40_000.0);
        assert_eq!(med[0].value, 10_000.0);
    }

    #[test]
    fn similarity_stats_split_near_and_far() {
        let s = similarity_stats(&[0.1, 0.5, 0.6, 0.9], 0.5);
        assert_eq!(s.count, 4);
        assert_eq!((s.near_count, s.far_count), (2, 2));
        assert!((s.median - 0.55).abs() < 1e-12);
        assert_eq!((s.min, s.max), (0.1, 0.9));
        assert!((s.mean - 0.525).abs() < 1e-12);
    }

    #[test]
    fn empty_similarity_distribution_is_all_zero() {
        let s = similarity_stats(&[], 0.5);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.percentiles.p90, 0.0);
    }

    #[test]
    fn diagnostic_is_consistent_with_its_parts() {
        let pop = population();
        let snap = snapshot(&pop);
        let target = Profile::new("Paris", Some(4.0), 48_000.0);
        let d = assemble_diagnostic(&target, &pop, &snap, &SimilarityConfig::default());

        assert!((0.0..=1.0).contains(&d.coherence_score));
        assert_eq!(d.diagnostic.band, DiagnosticBand::from_score(d.coherence_score));
        assert_eq!(d.similarity.count, pop.len());
        assert_eq!(d.chart_data.histogram.iter().map(|b| b.count).sum::<usize>(), pop.len());
        // 8 of 20 compensations are strictly below 48_000.
        assert_eq!(d.salary_position.percentile, 40);
        assert_eq!(d.salary_position.rank_label, RankLabel::LowerMid);
        assert_eq!(d.meta.snapshot_version, snap.version());
        assert_eq!(d.actual_compensation, 48_000.0);
        assert!(d.salary_position.comparison.contains('%'));
    }

    #[test]
    fn closest_peers_prefer_same_location_and_xp() {
        let pop = population();
        let snap = snapshot(&pop);
        let target = Profile::new("Lyon", Some(3.5), 45_000.0);
        let scores = peer_scores(&target, &pop, &snap, &SimilarityConfig::default());
        let top = closest_peers(&scores, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].record.location, "Lyon");
        assert_eq!(top[0].record.years_xp, Some(3.5));
        assert!((top[0].feature_similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn summary_counts_distinct_identities() {
        let mut a = ScoreRecord::from_profile(&Profile::new("A", None, 10.0).with_identity("x@y"));
        let b = ScoreRecord::from_profile(&Profile::new("A", None, 30.0).with_identity("x@y"));
        let c = ScoreRecord::from_profile(&Profile::new("A", None, 20.0));
        let s = summarize_scores(&[a.clone(), b, c]);
        assert_eq!(s.number_of_scores, 3);
        assert_eq!(s.average_compensation, 20.0);
        assert_eq!(s.median_compensation, 20.0);
        assert_eq!(s.number_of_users, 1);

        a.identity_token = Some(String::new());
        assert_eq!(summarize_scores(&[a]).number_of_users, 0);
        assert_eq!(summarize_scores(&[]).number_of_scores, 0);
    }
}
