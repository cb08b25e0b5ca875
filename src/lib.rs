pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, MissingPolicy, OutputFormat};
pub use config::{CliOverrides, Config, MissingAction, OutputConfig, PolicyConfig, SourceConfig};
pub use error::{GetfwError, Result, UserFriendlyError};

// Core functionality re-exports
pub use catalog::{FirmwarePackage, CATALOG};
pub use extractor::{ConfigSnapshot, ExtractionProgress, ExtractionReport, FileOperations, OutputManager};
pub use scanner::{DriverStore, ExtractionPlan, PackageResolver};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::PathBuf;

/// Main library interface for the firmware extractor
pub struct Getfw {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl Getfw {
    /// Create a new instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(false);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create an instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            cli::OutputFormat::Human => OutputMode::Human,
            cli::OutputFormat::Json => OutputMode::Json,
            cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Resolve the catalog against the configured source, without writing
    /// anything. Used by both the real extraction and the dry run.
    pub fn build_plan(&self) -> Result<(DriverStore, ExtractionPlan)> {
        let windows_root = self.windows_root()?;

        self.output_formatter.start_operation("Validating Windows source root");

        let store = DriverStore::open(
            &windows_root,
            &self.config.file_repository(),
            &self.config.policy.exclude_patterns,
        )?;

        self.output_formatter.debug(&format!(
            "Driver store: {} ({} package directories)",
            store.repository_path().display(),
            store.package_count()
        ));

        self.output_formatter.start_operation("Resolving firmware packages");

        let spinner = self
            .progress_manager
            .create_spinner("Matching driver packages...");
        let resolver = PackageResolver::new(&store, &self.config.policy);
        let resolved = resolver.resolve();
        spinner.finish_and_clear();
        let plan = resolved?;

        self.output_formatter.info(&format!(
            "Resolved {} files ({} packages omitted)",
            plan.entries.len(),
            plan.missing.len()
        ));

        for missing in &plan.missing {
            self.output_formatter.warning(&format!(
                "Skipping package '{}': {}",
                missing.package, missing.reason
            ));
        }

        Ok((store, plan))
    }

    /// Run the full extraction: validate, resolve, rebuild the output tree,
    /// copy, link, report.
    pub fn extract(&self) -> Result<ExtractionReport> {
        self.shutdown.check_shutdown()?;

        let (store, plan) = self.build_plan()?;
        self.shutdown.check_shutdown()?;

        let output_manager = OutputManager::new(
            self.config.output.directory.clone(),
            self.config.output.generate_report,
        );
        output_manager.initialize()?;

        self.output_formatter.success(&format!(
            "Initialized output directory: {}",
            output_manager.get_output_directory().display()
        ));

        self.shutdown.check_shutdown()?;

        let progress = self.copy_files(&plan, &output_manager)?;
        self.shutdown.check_shutdown()?;

        let config_snapshot = self.create_config_snapshot();
        let report = output_manager.create_extraction_report(
            &self.windows_root()?,
            store.repository_path(),
            &plan,
            &progress,
            &config_snapshot,
        )?;

        self.output_formatter.print_extraction_summary(&progress);

        Ok(report)
    }

    fn copy_files(
        &self,
        plan: &ExtractionPlan,
        output_manager: &OutputManager,
    ) -> Result<ExtractionProgress> {
        self.output_formatter.start_operation("Extracting firmware files");

        let file_progress = self
            .progress_manager
            .create_file_progress(plan.entries.len() as u64);
        let progress_callback = {
            let pb = file_progress.clone();
            move |progress: &ExtractionProgress| {
                ui::progress::update_file_progress(&pb, progress);
            }
        };

        let file_ops =
            FileOperations::new().with_preserve_mtimes(self.config.output.preserve_mtimes);

        let progress = file_ops.extract_plan(
            plan,
            output_manager.get_output_directory(),
            Some(&progress_callback),
        )?;

        ui::progress::finish_progress_with_summary(
            &file_progress,
            &format!("Extracted {} files", progress.files_processed),
            progress.elapsed(),
        );

        Ok(progress)
    }

    fn windows_root(&self) -> Result<PathBuf> {
        self.config
            .source
            .windows_root
            .clone()
            .ok_or_else(|| GetfwError::InvalidSource {
                path: "(none)".to_string(),
                reason: "no Windows root given (use --windows or set source.windows_root)"
                    .to_string(),
            })
    }

    fn create_config_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            missing_policy: match self.config.policy.missing {
                MissingAction::Fail => "fail".to_string(),
                MissingAction::Warn => "warn".to_string(),
            },
            skipped_packages: self.config.policy.skip.clone(),
            preserve_mtimes: self.config.output.preserve_mtimes,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &GetfwError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<std::path::Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(GetfwError::Io)?;
        Ok(())
    }
}
