//! Command-line parsing for the salary coherence engine.
//!
//! Argument parsing and command dispatch stay separate from the modeling code:
//! this module only describes flags, `app` turns them into an `EngineConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "coherence", version, about = "Salary coherence scoring against a compensation population")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full diagnostic for one profile, with optional charts and exports.
    Score(ScoreArgs),
    /// Print the coherence score only (useful for scripting).
    Coherence(ProfileArgs),
    /// Print the predicted compensation only.
    Predict(ProfileArgs),
    /// Train on the population and persist the snapshot for later warm starts.
    Train(EngineArgs),
    /// Score a batch of profiles and print global figures over them.
    Summary(SummaryArgs),
}

/// Where the training population comes from. Exactly one is required.
#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct PopulationArgs {
    /// Population CSV (columns: location, years_xp, compensation).
    #[arg(long, value_name = "CSV", env = "COHERENCE_POPULATION")]
    pub population: Option<PathBuf>,

    /// Read the population from the HTTP feed configured in COHERENCE_FEED_URL.
    #[arg(long)]
    pub feed: bool,

    /// Use a synthetic population of N records.
    #[arg(long, value_name = "N")]
    pub demo: Option<usize>,
}

/// Options shared by every subcommand that builds an engine.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    #[command(flatten)]
    pub population: PopulationArgs,

    /// Seed for the synthetic population.
    #[arg(long, default_value_t = 7)]
    pub demo_seed: u64,

    /// Snapshot file used for warm starts.
    #[arg(long, value_name = "JSON", env = "COHERENCE_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Neither load nor save a snapshot.
    #[arg(long)]
    pub no_persist: bool,

    /// Training RNG seed (entropy when omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hidden layer widths, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = vec![64, 16])]
    pub hidden: Vec<usize>,

    #[arg(long, default_value_t = 0.01)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 200)]
    pub max_epochs: usize,

    /// Epochs without validation improvement before stopping.
    #[arg(long, default_value_t = 10)]
    pub patience: usize,

    #[arg(long, default_value_t = 1e-6)]
    pub min_delta: f64,

    #[arg(long, default_value_t = 0.1)]
    pub validation_fraction: f64,

    /// Below this population size no network is trained.
    #[arg(long, default_value_t = 5)]
    pub min_records: usize,

    /// Keep the best-validation weights instead of the last epoch's.
    #[arg(long)]
    pub restore_best: bool,

    /// Give up training after this many seconds and use the fallback model.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Weight of the location term in profile similarity.
    #[arg(long, default_value_t = 0.6)]
    pub w_location: f64,

    /// Weight of the experience term in profile similarity.
    #[arg(long, default_value_t = 0.4)]
    pub w_xp: f64,

    /// Experience kernel width, in years.
    #[arg(long, default_value_t = 2.0)]
    pub sigma_xp: f64,

    /// Similarity above which a record counts as a near peer.
    #[arg(long, default_value_t = 0.5)]
    pub near_threshold: f64,

    /// Histogram bins for the similarity distribution.
    #[arg(long, default_value_t = 10)]
    pub bins: usize,
}

/// The profile to score.
#[derive(Debug, Args, Clone)]
pub struct ProfileFields {
    /// Location; unknown or empty maps to the fallback bucket.
    #[arg(long, default_value = "")]
    pub location: String,

    /// Years of experience (0 when omitted).
    #[arg(long)]
    pub xp: Option<f64>,

    /// Declared compensation.
    #[arg(long)]
    pub compensation: f64,

    /// Identity token used to attribute stored analyses.
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub profile: ProfileFields,

    /// Disable the terminal charts.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 60)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 15)]
    pub height: usize,

    /// Show the N most similar population records.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Export the diagnostic to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Export per-record similarity scores to CSV.
    #[arg(long = "export-peers", value_name = "CSV")]
    pub export_peers: Option<PathBuf>,

    /// Store the analysis and print its id.
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Profiles to score (same columns as the population, plus optional email).
    #[arg(long, value_name = "CSV")]
    pub profiles: PathBuf,

    /// List the stored analyses attributed to this identity token.
    #[arg(long)]
    pub identity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_with_defaults() {
        let cli = Cli::try_parse_from([
            "coherence",
            "score",
            "--demo",
            "50",
            "--location",
            "Paris",
            "--xp",
            "3",
            "--compensation",
            "45000",
        ])
        .unwrap();
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        assert_eq!(args.engine.population.demo, Some(50));
        assert_eq!(args.engine.hidden, vec![64, 16]);
        assert_eq!(args.profile.xp, Some(3.0));
        assert_eq!(args.top, 5);
        assert!(!args.save);
    }

    #[test]
    fn hidden_layers_are_comma_separated() {
        let cli = Cli::try_parse_from(["coherence", "train", "--demo", "10", "--hidden", "8,4,2"]).unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.hidden, vec![8, 4, 2]);
    }

    #[test]
    fn population_sources_are_exclusive() {
        let res = Cli::try_parse_from(["coherence", "train", "--demo", "10", "--feed"]);
        assert!(res.is_err());
    }
}
