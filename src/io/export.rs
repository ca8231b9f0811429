//! Export diagnostics (JSON) and per-record peer scores (CSV).
//!
//! Both exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::DiagnosticResult;
use crate::error::{Error, Result};
use crate::report::PeerScore;

/// Write a diagnostic as pretty JSON.
pub fn write_diagnostic_json(path: &Path, diagnostic: &DiagnosticResult) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Config(format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, diagnostic)?;
    Ok(())
}

/// Write one row per population member with both similarity scores.
pub fn write_peer_scores_csv(path: &Path, scores: &[PeerScore]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Config(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_peer_scores(file, scores)
}

fn write_peer_scores<W: Write>(out: W, scores: &[PeerScore]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["location", "years_xp", "compensation", "feature_similarity", "aligned_similarity"])
        .map_err(|e| Error::Config(format!("Failed to write export CSV header: {e}")))?;

    for s in scores {
        let r = &s.record;
        writer
            .write_record([
                r.location.clone(),
                r.years_xp.map(|v| format!("{v}")).unwrap_or_default(),
                format!("{:.2}", r.compensation),
                format!("{:.6}", s.feature_similarity),
                format!("{:.6}", s.aligned_similarity),
            ])
            .map_err(|e| Error::Config(format!("Failed to write export CSV row: {e}")))?;
    }
    writer.flush()?;
    Ok(())
}
