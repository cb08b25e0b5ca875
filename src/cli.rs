use crate::config::{CliOverrides, Config, MissingAction};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "getfw")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract Surface Pro X firmware from a Windows image")]
#[command(
    long_about = "getfw locates known firmware payloads in the driver store of a mounted \
                  Windows installation or recovery image and assembles them into a \
                  normalized /lib/firmware-style output tree."
)]
#[command(after_help = "EXAMPLES:\n  \
    getfw -w /mnt/windows\n  \
    getfw -w /mnt/windows -o firmware --missing warn\n  \
    getfw -w /mnt/windows --skip mcfg,mpss/library --dry-run\n  \
    getfw --list\n\n\
    The Windows volume must be mounted read-only and, if BitLocker-protected, \
    unlocked first.")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Mounted Windows root directory
    #[arg(short, long, value_name = "PATH")]
    pub windows: Option<PathBuf>,

    /// Output directory (default: out)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Policy for firmware packages missing from the source
    #[arg(long, value_enum)]
    pub missing: Option<MissingPolicy>,

    /// Catalog packages to skip (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub skip: Option<Vec<String>>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Do not write the extraction report into the output tree
    #[arg(long)]
    pub no_report: bool,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show what would be extracted without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the firmware catalog and exit
    #[arg(long)]
    pub list: bool,

    /// Generate a sample configuration file
    #[arg(long)]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MissingPolicy {
    /// Fail fast before the output tree is touched
    Fail,
    /// Record the omission and continue with the remaining packages
    Warn,
}

impl From<MissingPolicy> for MissingAction {
    fn from(policy: MissingPolicy) -> Self {
        match policy {
            MissingPolicy::Fail => MissingAction::Fail,
            MissingPolicy::Warn => MissingAction::Warn,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> crate::error::Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_windows_root(self.windows.clone())
            .with_output_dir(self.output.clone())
            .with_missing(self.missing.map(MissingAction::from))
            .with_skip(self.skip.clone())
            .with_generate_report(if self.no_report { Some(false) } else { None })
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_from(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_minimal_invocation() {
        let cli = cli_from(&["getfw", "-w", "/mnt/windows"]);
        assert_eq!(cli.windows, Some(PathBuf::from("/mnt/windows")));
        assert!(cli.output.is_none());
        assert!(cli.missing.is_none());
    }

    #[test]
    fn test_skip_list_is_comma_separated() {
        let cli = cli_from(&["getfw", "-w", "/w", "--skip", "mcfg,mpss/library"]);
        assert_eq!(
            cli.skip,
            Some(vec!["mcfg".to_string(), "mpss/library".to_string()])
        );
    }

    #[test]
    fn test_missing_policy_override() {
        let cli = cli_from(&["getfw", "-w", "/w", "--missing", "warn"]);
        let config = {
            let mut config = Config::default();
            config.merge_with_cli_args(&cli.create_cli_overrides());
            config
        };
        assert_eq!(config.policy.missing, MissingAction::Warn);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["getfw", "-w", "/w", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_verbosity_level() {
        let cli = cli_from(&["getfw", "-w", "/w", "-vv"]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = cli_from(&["getfw", "-w", "/w", "-q"]);
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_no_report_override() {
        let cli = cli_from(&["getfw", "-w", "/w", "--no-report"]);
        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());
        assert!(!config.output.generate_report);
    }
}
