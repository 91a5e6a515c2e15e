use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "swarm", version, about = "Plan, dispatch and review a multi-agent coding job")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file. Overrides `$SWARM_CONFIG` and the default search path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one job to completion.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// What to build.
    #[arg(group = "input")]
    pub description: Option<String>,

    /// Read the description from a file.
    #[arg(long, group = "input")]
    pub description_file: Option<PathBuf>,

    #[arg(long)]
    pub revision_ceiling: Option<u32>,

    #[arg(long)]
    pub max_fixes: Option<usize>,

    /// Output directory for artifacts.
    #[arg(long)]
    pub output: Option<String>,

    /// Write JSONL events to this path (`stdout:` for stdout).
    #[arg(long)]
    pub events: Option<String>,

    /// Print the full outcome as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let args = Args::try_parse_from([
            "swarm",
            "run",
            "build a game",
            "--revision-ceiling",
            "4",
            "--max-fixes",
            "2",
            "--output",
            "./out",
            "--config",
            "swarm.toml",
        ])
        .unwrap();
        let Commands::Run(run) = args.command;
        assert_eq!(run.description.as_deref(), Some("build a game"));
        assert_eq!(run.revision_ceiling, Some(4));
        assert_eq!(run.max_fixes, Some(2));
        assert_eq!(run.output.as_deref(), Some("./out"));
        assert_eq!(args.config, Some(PathBuf::from("swarm.toml")));
    }

    #[test]
    fn description_sources_are_exclusive() {
        let err = Args::try_parse_from([
            "swarm",
            "run",
            "inline",
            "--description-file",
            "job.txt",
        ]);
        assert!(err.is_err());
    }
}
