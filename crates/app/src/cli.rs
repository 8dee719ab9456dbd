//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "roadforge")]
#[command(about = "Headless road network builder and OpenDRIVE exporter")]
pub struct CliArgs {
    /// Map to start from; a demo network is built when absent
    #[arg(long, value_name = "FILE")]
    pub load: Option<PathBuf>,
    /// Write the map as OpenDRIVE
    #[arg(long, value_name = "OUT")]
    pub xodr: Option<PathBuf>,
    /// Write the map in the binary format
    #[arg(long, value_name = "OUT")]
    pub save: Option<PathBuf>,
    /// Skip LZ4 compression for `--save`
    #[arg(long)]
    pub uncompressed: bool,
    /// Print the diagnostics report as JSON
    #[arg(long)]
    pub report: bool,
    /// Read JSON commands from stdin instead of running a batch
    #[arg(long, conflicts_with_all = ["load", "xodr", "save", "report"])]
    pub agent: bool,
}

impl CliArgs {
    pub fn compress(&self) -> bool {
        !self.uncompressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("roadforge").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_arguments_builds_demo() {
        let args = parse(&[]).expect("parse");
        assert_eq!(args.load, None);
        assert!(args.compress());
        assert!(!args.report);
        assert!(!args.agent);
    }

    #[test]
    fn test_paths_and_flags() {
        let args = parse(&[
            "--load",
            "city.rdnt",
            "--xodr",
            "out/city.xodr",
            "--uncompressed",
            "--report",
        ])
        .expect("parse");
        assert_eq!(args.load, Some(PathBuf::from("city.rdnt")));
        assert_eq!(args.xodr, Some(PathBuf::from("out/city.xodr")));
        assert_eq!(args.save, None);
        assert!(!args.compress());
        assert!(args.report);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let err = parse(&["--save"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_unknown_flag() {
        let err = parse(&["--fast"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_agent_excludes_batch_flags() {
        let err = parse(&["--agent", "--report"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        assert!(parse(&["--agent"]).expect("parse").agent);
    }
}
