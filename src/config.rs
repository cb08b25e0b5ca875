use crate::error::{GetfwError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Mounted Windows installation or recovery image.
    pub windows_root: Option<PathBuf>,
    /// Driver store location relative to the Windows root. Only needed for
    /// images with a non-standard layout.
    pub file_repository: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub preserve_mtimes: bool,
    pub generate_report: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub missing: MissingAction,
    /// Catalog package names to skip entirely.
    pub skip: Vec<String>,
    /// Regex patterns for driver-package directory names to ignore during
    /// resolution (e.g. stale copies left behind by driver updates).
    pub exclude_patterns: Vec<String>,
}

/// What to do when a catalogued package cannot be resolved in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAction {
    /// Fail fast before anything is written. A partial firmware tree is
    /// unsafe to flash, so this is the default.
    #[default]
    Fail,
    /// Record the omission, extract everything else, exit with code 2.
    Warn,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("out"),
            preserve_mtimes: true,
            generate_report: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GetfwError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GetfwError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| GetfwError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["getfw.toml", ".getfw.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref windows_root) = cli_args.windows_root {
            self.source.windows_root = Some(windows_root.clone());
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(missing) = cli_args.missing {
            self.policy.missing = missing;
        }

        if let Some(ref skip) = cli_args.skip {
            self.policy.skip.extend(skip.clone());
        }

        if let Some(generate_report) = cli_args.generate_report {
            self.output.generate_report = generate_report;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| GetfwError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| GetfwError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for name in &self.policy.skip {
            if crate::catalog::find_package(name).is_none() {
                return Err(GetfwError::Config {
                    message: format!("Unknown package in skip list: '{}'", name),
                });
            }
        }

        for pattern in &self.policy.exclude_patterns {
            regex::Regex::new(pattern).map_err(|e| GetfwError::Config {
                message: format!("Invalid exclude pattern '{}': {}", pattern, e),
            })?;
        }

        if let Some(ref repo) = self.source.file_repository {
            if repo.is_absolute() {
                return Err(GetfwError::Config {
                    message: format!(
                        "file_repository must be relative to the Windows root: {}",
                        repo.display()
                    ),
                });
            }
        }

        if self.output.directory.as_os_str().is_empty() {
            return Err(GetfwError::Config {
                message: "Output directory must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Driver store path relative to the Windows root.
    pub fn file_repository(&self) -> PathBuf {
        self.source
            .file_repository
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::catalog::FILE_REPOSITORY))
    }

    pub fn create_sample_config() -> String {
        r#"# getfw configuration file.
# Command-line flags override the values set here.

[source]
# Mounted Windows installation or recovery image. Unlock BitLocker-protected
# volumes before mounting.
# windows_root = "/mnt/windows"

# Driver store location relative to the Windows root. Only needed for images
# with a non-standard layout.
# file_repository = "Windows/System32/DriverStore/FileRepository"

[output]
directory = "out"
preserve_mtimes = true
generate_report = true

[policy]
# What to do when a firmware package cannot be found: "fail" stops before
# anything is written, "warn" extracts the rest and exits with code 2.
missing = "fail"

# Catalog packages to skip entirely (see --list for names).
skip = []

# Regex patterns for driver-package directory names to ignore during
# resolution (e.g. stale copies left behind by driver updates).
exclude_patterns = []
"#
        .to_string()
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub windows_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub missing: Option<MissingAction>,
    pub skip: Option<Vec<String>>,
    pub generate_report: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_windows_root(mut self, windows_root: Option<PathBuf>) -> Self {
        self.windows_root = windows_root;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_missing(mut self, missing: Option<MissingAction>) -> Self {
        self.missing = missing;
        self
    }

    pub fn with_skip(mut self, skip: Option<Vec<String>>) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_generate_report(mut self, generate_report: Option<bool>) -> Self {
        self.generate_report = generate_report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.policy.missing, MissingAction::Fail);
        assert!(config.output.preserve_mtimes);
        assert!(config.source.windows_root.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.policy.skip.push("bogus".to_string());
        assert!(config.validate().is_err());

        config.policy.skip.clear();
        config.policy.exclude_patterns.push("[invalid".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let config = Config::default();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("getfw.toml");

        config.save_to_file(&path).unwrap();

        let loaded_config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.output.directory, loaded_config.output.directory);
        assert_eq!(config.policy.missing, loaded_config.policy.missing);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_windows_root(Some(PathBuf::from("/mnt/windows")))
            .with_missing(Some(MissingAction::Warn))
            .with_skip(Some(vec!["mcfg".to_string()]));

        config.merge_with_cli_args(&overrides);

        assert_eq!(
            config.source.windows_root,
            Some(PathBuf::from("/mnt/windows"))
        );
        assert_eq!(config.policy.missing, MissingAction::Warn);
        assert_eq!(config.policy.skip, vec!["mcfg"]);
    }

    #[test]
    fn test_missing_action_parsing() {
        let config: Config = toml::from_str("[policy]\nmissing = \"warn\"\n").unwrap();
        assert_eq!(config.policy.missing, MissingAction::Warn);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[source]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[policy]"));
        assert!(sample.lines().any(|l| l.starts_with('#')));

        // The sample must parse back to the defaults and pass validation.
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.output.directory, Config::default().output.directory);
        assert_eq!(parsed.policy.missing, MissingAction::Fail);
        assert!(parsed.source.windows_root.is_none());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_default_file_repository() {
        let config = Config::default();
        assert_eq!(
            config.file_repository(),
            PathBuf::from("Windows/System32/DriverStore/FileRepository")
        );
    }
}
