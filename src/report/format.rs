//! Terminal rendering of diagnostics, peers and summaries.
//!
//! Everything here returns a `String`; printing is left to `app`.

use crate::domain::{AnalysisRef, DiagnosticResult, ScoreSummary};
use crate::models::ModelSnapshot;
use crate::report::PeerScore;

/// Format the full diagnostic for one profile.
pub fn format_diagnostic(d: &DiagnosticResult) -> String {
    let mut out = String::new();

    out.push_str("=== coherence - salary diagnostic ===\n");
    out.push_str(&format!("{}\n", d.diagnostic.title));
    out.push_str(&format!("{}\n", d.diagnostic.description));
    out.push_str(&format!("Coherence score: {:.3}\n", d.coherence_score));

    let gap = &d.estimated_gap;
    out.push_str("\nEstimated gap:\n");
    out.push_str(&format!(
        "- predicted={:.0} actual={:.0} difference={:+.0} ({:+.1}%)\n",
        gap.predicted, gap.actual, gap.difference, gap.percentage
    ));
    out.push_str(&format!("- {}\n", gap.comment));

    let pos = &d.salary_position;
    out.push_str("\nSalary position:\n");
    out.push_str(&format!(
        "- percentile {} ({})\n",
        pos.percentile,
        pos.rank_label.display_name()
    ));
    out.push_str(&format!("- {}\n", pos.comparison));

    let s = &d.similarity;
    out.push_str("\nPeer similarity:\n");
    out.push_str(&format!(
        "n={} mean={:.3} sd={:.3} median={:.3} min={:.3} max={:.3}\n",
        s.count, s.mean, s.std_dev, s.median, s.min, s.max
    ));
    out.push_str(&format!(
        "p10={:.3} p25={:.3} p50={:.3} p75={:.3} p90={:.3}\n",
        s.percentiles.p10, s.percentiles.p25, s.percentiles.p50, s.percentiles.p75, s.percentiles.p90
    ));
    out.push_str(&format!(
        "near={} far={} (threshold {:.2})\n",
        s.near_count, s.far_count, d.similarity_config.near_threshold
    ));

    let m = &d.meta;
    out.push_str(&format!(
        "\nSnapshot v{} ({}) | locations={} | xp=[{:.1}, {:.1}] | compensation=[{:.0}, {:.0}]\n",
        m.snapshot_version,
        m.origin.display_name(),
        m.locations.len(),
        m.xp_range.min,
        m.xp_range.max,
        m.output_range.min,
        m.output_range.max,
    ));

    out
}

/// Format the closest population members as a table.
pub fn format_closest_peers(peers: &[PeerScore]) -> String {
    let mut out = String::new();
    out.push_str("Closest profiles:\n");
    out.push_str(
        format!(
            "{:<16} {:>6} {:>12} {:>10} {:>10}\n",
            "location", "xp", "compensation", "similar", "aligned"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<6} {:-<12} {:-<10} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for p in peers {
        let r = &p.record;
        let location = if r.location.is_empty() { "-" } else { r.location.as_str() };
        out.push_str(
            format!(
                "{:<16} {:>6.1} {:>12.0} {:>10.3} {:>10.3}\n",
                truncate(location, 16),
                r.xp(),
                r.compensation,
                p.feature_similarity,
                p.aligned_similarity,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// One-paragraph description of an installed snapshot.
pub fn format_training(snapshot: &ModelSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Snapshot v{} ({}) trained at {}\n",
        snapshot.version(),
        snapshot.origin().display_name(),
        snapshot.trained_at().format("%Y-%m-%d %H:%M:%S UTC"),
    ));
    out.push_str(&format!("Locations: {}\n", snapshot.vocabulary().entries().join(", ")));
    out.push_str(&format!(
        "Ranges: xp=[{:.1}, {:.1}] | compensation=[{:.0}, {:.0}]\n",
        snapshot.xp_range().min,
        snapshot.xp_range().max,
        snapshot.output_range().min,
        snapshot.output_range().max,
    ));
    if let Some(r) = snapshot.report() {
        out.push_str(&format!(
            "Epochs: {} (best {}) | train MAE={:.4} val MAE={:.4} val MSE={:.5}",
            r.epochs_run, r.best_epoch, r.final_train_loss, r.final_val_loss, r.final_val_mse
        ));
        if r.stopped_early {
            out.push_str(" | stopped early");
        }
        if r.restored_best {
            out.push_str(" | best weights restored");
        }
        out.push('\n');
    }
    out
}

pub fn format_summary(summary: &ScoreSummary) -> String {
    format!(
        "Scores: {} | users: {} | average compensation: {:.0} | median compensation: {:.0}\n",
        summary.number_of_scores,
        summary.number_of_users,
        summary.average_compensation,
        summary.median_compensation,
    )
}

pub fn format_analysis_refs(token: &str, refs: &[AnalysisRef]) -> String {
    let mut out = format!("Analyses for {token}: {}\n", refs.len());
    for r in refs {
        out.push_str(&format!(
            "- {} {} xp={} compensation={:.0}\n",
            r.id,
            r.input.location.as_deref().unwrap_or("-"),
            r.input.years_xp.map(|x| format!("{x:.1}")).unwrap_or_else(|| "-".to_string()),
            r.input.compensation,
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompensationRecord, Profile, SimilarityConfig, TrainingConfig};
    use crate::fit::fit_snapshot;
    use crate::report::assemble_diagnostic;

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("Paris", 16), "Paris");
        assert_eq!(truncate("Saint-Pierre-des-Corps", 8), "Saint-P.");
    }

    #[test]
    fn peers_table_has_header_and_one_row_each() {
        let peers = vec![
            PeerScore {
                record: CompensationRecord::new("Paris", Some(2.0), 40_000.0),
                feature_similarity: 1.0,
                aligned_similarity: 0.5,
            },
            PeerScore {
                record: CompensationRecord::new("", None, 30_000.0),
                feature_similarity: 0.25,
                aligned_similarity: 0.125,
            },
        ];
        let table = format_closest_peers(&peers);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("location"));
        assert_eq!(lines[3], "Paris               2.0        40000      1.000      0.500");
        assert!(lines[4].starts_with("- "));
    }

    #[test]
    fn diagnostic_mentions_band_and_gap() {
        let pop = vec![CompensationRecord::new("Paris", Some(2.0), 40_000.0)];
        let snap = fit_snapshot(&pop, &TrainingConfig::default(), None);
        let d = assemble_diagnostic(
            &Profile::new("Paris", Some(2.0), 40_000.0),
            &pop,
            &snap,
            &SimilarityConfig::default(),
        );
        let text = format_diagnostic(&d);
        assert!(text.contains(&d.diagnostic.title));
        assert!(text.contains(&d.estimated_gap.comment));
        assert!(text.contains("degenerate"));
    }

    #[test]
    fn summary_line() {
        let s = ScoreSummary {
            number_of_scores: 3,
            average_compensation: 41_000.4,
            median_compensation: 40_000.0,
            number_of_users: 2,
        };
        assert_eq!(
            format_summary(&s),
            "Scores: 3 | users: 2 | average compensation: 41000 | median compensation: 40000\n"
        );
    }
}
