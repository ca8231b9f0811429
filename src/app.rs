//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - picks the population source
//! - starts the engine and waits for its first snapshot
//! - prints reports/charts
//! - writes optional exports

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Command, EngineArgs, ProfileArgs, ProfileFields, ScoreArgs, SummaryArgs};
use crate::data::{CsvSource, FeedSource, PopulationSource, SampleConfig, SampleSource};
use crate::domain::{EngineConfig, Profile, SimilarityConfig, TrainingConfig};
use crate::engine::{CoherenceEngine, default_snapshot_path};
use crate::error::{Error, Result};
use crate::models::SnapshotOrigin;
use crate::report::format;

pub mod pipeline;

type Engine = CoherenceEngine<Box<dyn PopulationSource>>;

/// Entry point for the `coherence` binary.
pub async fn run() -> Result<()> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Score(args) => handle_score(args).await,
        Command::Coherence(args) => handle_profile(args, ProfileOutput::Coherence).await,
        Command::Predict(args) => handle_profile(args, ProfileOutput::Predict).await,
        Command::Train(args) => handle_train(args).await,
        Command::Summary(args) => handle_summary(args).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProfileOutput {
    Coherence,
    Predict,
}

async fn handle_score(args: ScoreArgs) -> Result<()> {
    let engine = start_engine(&args.engine)?;
    let profile = profile_from_args(&args.profile)?;
    let run = pipeline::run_score(&engine, &profile, args.top, args.save).await?;

    println!("{}", format::format_diagnostic(&run.diagnostic));
    println!("{}", format::format_closest_peers(&run.closest));

    if !args.no_plot {
        let chart = &run.diagnostic.chart_data;
        println!("Similarity distribution:");
        println!("{}", crate::plot::render_histogram(&chart.histogram, args.width));
        println!("Compensation by experience:");
        println!(
            "{}",
            crate::plot::render_xp_chart(
                &chart.average_by_xp,
                &chart.median_by_xp,
                Some((profile.xp(), profile.compensation)),
                args.width,
                args.height,
            )
        );
    }

    if let Some(path) = &args.export_json {
        crate::io::export::write_diagnostic_json(path, &run.diagnostic)?;
        info!(path = %path.display(), "Diagnostic exported");
    }
    if let Some(path) = &args.export_peers {
        crate::io::export::write_peer_scores_csv(path, &run.peers)?;
        info!(path = %path.display(), rows = run.peers.len(), "Peer scores exported");
    }
    if let Some(id) = run.analysis_id {
        println!("Analysis saved: {id}");
    }

    Ok(())
}

async fn handle_profile(args: ProfileArgs, output: ProfileOutput) -> Result<()> {
    let engine = start_engine(&args.engine)?;
    let profile = profile_from_args(&args.profile)?;

    match output {
        ProfileOutput::Coherence => println!("{:.4}", engine.coherence_score(&profile).await),
        ProfileOutput::Predict => println!("{:.0}", engine.predict(&profile).await),
    }
    Ok(())
}

async fn handle_train(args: EngineArgs) -> Result<()> {
    let engine = start_engine(&args)?;
    let mut snapshot = engine.snapshot().await;

    // A reused network has not seen the current population.
    if snapshot.origin() == SnapshotOrigin::WarmStart {
        engine.refresh_model().await?;
        snapshot = engine.snapshot().await;
    }

    print!("{}", format::format_training(&snapshot));
    match &engine.config().snapshot_path {
        Some(path) if snapshot.origin() != SnapshotOrigin::Degenerate => {
            println!("Snapshot: {}", path.display());
        }
        Some(_) => println!("Snapshot: not saved (too few records to train)"),
        None => println!("Snapshot: persistence disabled"),
    }
    Ok(())
}

async fn handle_summary(args: SummaryArgs) -> Result<()> {
    let engine = start_engine(&args.engine)?;
    let path = args.profiles.clone();
    let (profiles, row_errors) = tokio::task::spawn_blocking(move || crate::io::ingest::load_profiles_csv(&path))
        .await
        .map_err(|e| Error::Internal(format!("Profile ingest task failed: {e}")))??;

    for err in row_errors.iter().take(5) {
        warn!(line = err.line, "Skipped profile row: {}", err.message);
    }
    if profiles.is_empty() {
        return Err(Error::Config(format!(
            "No usable profiles in '{}'.",
            args.profiles.display()
        )));
    }

    engine.ready().await;
    for profile in &profiles {
        engine.analyze_and_save(profile).await?;
    }

    print!("{}", format::format_summary(&engine.score_summary().await?));
    if let Some(token) = &args.identity {
        let refs = engine.find_analyses_by_identity(token).await?;
        print!("{}", format::format_analysis_refs(token, &refs));
    }
    Ok(())
}

fn start_engine(args: &EngineArgs) -> Result<Arc<Engine>> {
    let config = engine_config_from_args(args)?;
    let source = population_source(args)?;
    info!(source = %source.describe(), "Starting engine");
    Ok(CoherenceEngine::start(source, config))
}

fn population_source(args: &EngineArgs) -> Result<Box<dyn PopulationSource>> {
    let pop = &args.population;
    if let Some(path) = &pop.population {
        // The engine tolerates an unreadable source; the CLI should not.
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Population file '{}' does not exist.",
                path.display()
            )));
        }
        return Ok(Box::new(CsvSource::new(path.clone())));
    }
    if pop.feed {
        return Ok(Box::new(FeedSource::from_env()?));
    }
    if let Some(count) = pop.demo {
        let config = SampleConfig {
            count,
            seed: args.demo_seed,
            ..SampleConfig::default()
        };
        return Ok(Box::new(SampleSource::new(&config)?));
    }
    Err(Error::Config(
        "Choose a population with --population, --feed or --demo.".to_string(),
    ))
}

pub fn engine_config_from_args(args: &EngineArgs) -> Result<EngineConfig> {
    if args.hidden.iter().any(|&w| w == 0) {
        return Err(Error::Config("Hidden layer widths must be positive.".to_string()));
    }
    if !(args.learning_rate.is_finite() && args.learning_rate > 0.0) {
        return Err(Error::Config("Learning rate must be positive.".to_string()));
    }
    if args.batch_size == 0 {
        return Err(Error::Config("Batch size must be positive.".to_string()));
    }
    if !(0.0..1.0).contains(&args.validation_fraction) {
        return Err(Error::Config("Validation fraction must be in [0, 1).".to_string()));
    }
    if args.w_location < 0.0 || args.w_xp < 0.0 {
        return Err(Error::Config("Similarity weights must be non-negative.".to_string()));
    }
    if !(args.sigma_xp.is_finite() && args.sigma_xp > 0.0) {
        return Err(Error::Config("Experience kernel width must be positive.".to_string()));
    }
    if !(0.0..=1.0).contains(&args.near_threshold) {
        return Err(Error::Config("Near threshold must be in [0, 1].".to_string()));
    }
    if args.bins == 0 {
        return Err(Error::Config("Histogram needs at least one bin.".to_string()));
    }

    let snapshot_path = if args.no_persist {
        None
    } else {
        Some(args.snapshot.clone().unwrap_or_else(default_snapshot_path))
    };

    Ok(EngineConfig {
        training: TrainingConfig {
            hidden_layers: args.hidden.clone(),
            learning_rate: args.learning_rate,
            batch_size: args.batch_size,
            max_epochs: args.max_epochs,
            patience: args.patience,
            min_delta: args.min_delta,
            validation_fraction: args.validation_fraction,
            min_records: args.min_records,
            seed: args.seed,
            restore_best: args.restore_best,
            timeout: args.timeout_secs.map(Duration::from_secs),
        },
        similarity: SimilarityConfig {
            w_location: args.w_location,
            w_xp: args.w_xp,
            sigma_xp: args.sigma_xp,
            near_threshold: args.near_threshold,
            histogram_bins: args.bins,
        },
        snapshot_path,
    })
}

fn profile_from_args(args: &ProfileFields) -> Result<Profile> {
    if !(args.compensation.is_finite() && args.compensation >= 0.0) {
        return Err(Error::Config("Compensation must be a non-negative number.".to_string()));
    }
    if let Some(xp) = args.xp {
        if !(xp.is_finite() && xp >= 0.0) {
            return Err(Error::Config("Years of experience must be non-negative.".to_string()));
        }
    }
    let profile = Profile::new(args.location.trim(), args.xp, args.compensation);
    Ok(match &args.email {
        Some(token) if !token.trim().is_empty() => profile.with_identity(token.trim()),
        _ => profile,
    })
}
