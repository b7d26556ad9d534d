use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use harvester_core::StarRange;

#[derive(Parser, Debug)]
#[command(name = "harvester", author, version, about, long_about = None)]
pub struct Args {
    /// RON configuration file [default: ./harvester.ron when present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding partition artifacts and tables
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also append log output to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest every repository in a star range (`N` or `A..B`)
    Stars {
        range: StarRange,
    },
    /// Harvest the star ranges between descending breakpoints in a JSON file
    Breaks {
        file: PathBuf,
    },
    /// Harvest a star range restricted to a window of creation days
    Days {
        #[arg(long)]
        stars: StarRange,
        /// First creation day, YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,
        /// Last creation day, YYYY-MM-DD
        #[arg(long)]
        to: NaiveDate,
    },
    /// Run a paginated GraphQL query (with a `$start` cursor) to completion
    Scrape {
        query_file: PathBuf,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge all artifacts into the repository table
    Table {
        /// [default: <output-dir>/repos-by-stars.csv]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rank owners by the h-index of their repositories' stars
    HIndex {
        /// [default: <output-dir>/repos-by-stars.csv]
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// [default: <output-dir>/h-index.csv]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Omit owners below this h-index
        #[arg(long, default_value_t = 5)]
        min: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_star_range_and_global_flags() {
        let args = Args::try_parse_from([
            "harvester",
            "stars",
            "16..40",
            "--output-dir",
            "out",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        match args.command {
            Command::Stars { range } => assert_eq!(range, StarRange::new(16, 40).unwrap()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_day_window() {
        let args = Args::try_parse_from([
            "harvester",
            "days",
            "--stars",
            "10",
            "--from",
            "2015-01-01",
            "--to",
            "2015-03-31",
        ])
        .unwrap();
        match args.command {
            Command::Days { stars, from, to } => {
                assert_eq!(stars, StarRange::exact(10));
                assert_eq!(from, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
                assert_eq!(to, NaiveDate::from_ymd_opt(2015, 3, 31).unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn h_index_minimum_defaults_to_five() {
        let args = Args::try_parse_from(["harvester", "h-index"]).unwrap();
        assert!(matches!(args.command, Command::HIndex { min: 5, .. }));
    }

    #[test]
    fn malformed_star_range_is_rejected() {
        assert!(Args::try_parse_from(["harvester", "stars", "ten"]).is_err());
        assert!(Args::try_parse_from(["harvester", "stars", "9..1"]).is_err());
    }
}
