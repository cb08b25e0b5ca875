use crate::error::{format_bytes, GetfwError, Result};
use crate::extractor::ExtractionProgress;
use crate::scanner::ExtractionPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Metadata directory inside the output tree. Not part of the firmware
/// payload; downstream packaging should ignore it.
const METADATA_DIR: &str = ".getfw";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub source_root: String,
    pub driver_store: String,
    pub extraction_summary: ExtractionSummary,
    pub files: Vec<FileInfo>,
    pub missing_packages: Vec<MissingInfo>,
    pub extraction_time: DateTime<Utc>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_files: usize,
    pub total_bytes: u64,
    pub links_created: usize,
    pub extraction_duration: Duration,
    pub files_by_package: std::collections::BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub package: String,
    pub target_path: String,
    pub size: u64,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingInfo {
    pub package: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub missing_policy: String,
    pub skipped_packages: Vec<String>,
    pub preserve_mtimes: bool,
}

pub struct OutputManager {
    output_directory: PathBuf,
    generate_report: bool,
}

impl OutputManager {
    pub fn new(output_directory: PathBuf, generate_report: bool) -> Self {
        Self {
            output_directory,
            generate_report,
        }
    }

    /// Rebuild the output tree. Each run owns the destination, so an
    /// existing tree from a previous run is removed first.
    pub fn initialize(&self) -> Result<()> {
        let write_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                GetfwError::Permission {
                    path: self.output_directory.display().to_string(),
                }
            } else {
                GetfwError::Write {
                    path: self.output_directory.display().to_string(),
                    source: e,
                }
            }
        };

        if self.output_directory.exists() {
            fs::remove_dir_all(&self.output_directory).map_err(write_error)?;
        }

        fs::create_dir_all(&self.output_directory).map_err(write_error)?;

        if self.generate_report {
            let metadata_dir = self.output_directory.join(METADATA_DIR);
            fs::create_dir_all(&metadata_dir).map_err(|e| GetfwError::Write {
                path: metadata_dir.display().to_string(),
                source: e,
            })?;
        }

        Ok(())
    }

    pub fn get_output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn create_extraction_report(
        &self,
        source_root: &Path,
        driver_store: &Path,
        plan: &ExtractionPlan,
        progress: &ExtractionProgress,
        config: &ConfigSnapshot,
    ) -> Result<ExtractionReport> {
        let mut files_by_package = std::collections::BTreeMap::new();
        for entry in &plan.entries {
            *files_by_package
                .entry(entry.package.to_string())
                .or_insert(0) += 1;
        }

        let report = ExtractionReport {
            source_root: source_root.display().to_string(),
            driver_store: driver_store.display().to_string(),
            extraction_summary: ExtractionSummary {
                total_files: progress.files_processed,
                total_bytes: progress.bytes_processed,
                links_created: progress.links_created,
                extraction_duration: progress.elapsed(),
                files_by_package,
            },
            files: plan
                .entries
                .iter()
                .map(|entry| FileInfo {
                    package: entry.package.to_string(),
                    target_path: entry.target_path.display().to_string(),
                    size: entry.size,
                    modified: entry.modified,
                })
                .collect(),
            missing_packages: plan
                .missing
                .iter()
                .map(|m| MissingInfo {
                    package: m.package.clone(),
                    reason: m.reason.clone(),
                })
                .collect(),
            extraction_time: Utc::now(),
            config_used: config.clone(),
        };

        if self.generate_report {
            self.save_report_json(&report)?;
            self.save_report_text(&report)?;
        }

        Ok(report)
    }

    fn save_report_json(&self, report: &ExtractionReport) -> Result<()> {
        let report_path = self
            .output_directory
            .join(METADATA_DIR)
            .join("extraction_report.json");
        let json_content =
            serde_json::to_string_pretty(report).map_err(|e| GetfwError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        fs::write(&report_path, json_content).map_err(|e| GetfwError::Write {
            path: report_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    fn save_report_text(&self, report: &ExtractionReport) -> Result<()> {
        let summary_path = self.output_directory.join(METADATA_DIR).join("summary.txt");
        let mut file = fs::File::create(&summary_path).map_err(|e| GetfwError::Write {
            path: summary_path.display().to_string(),
            source: e,
        })?;

        writeln!(file, "getfw extraction summary")?;
        writeln!(file, "========================")?;
        writeln!(file)?;
        writeln!(file, "Source root:  {}", report.source_root)?;
        writeln!(file, "Driver store: {}", report.driver_store)?;
        writeln!(
            file,
            "Extracted:    {} ({} files, {} links)",
            format_bytes(report.extraction_summary.total_bytes),
            report.extraction_summary.total_files,
            report.extraction_summary.links_created,
        )?;
        writeln!(
            file,
            "Date:         {}",
            report.extraction_time.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(file)?;

        writeln!(file, "Files by package:")?;
        for (package, count) in &report.extraction_summary.files_by_package {
            writeln!(file, "  {}: {} files", package, count)?;
        }

        if !report.missing_packages.is_empty() {
            writeln!(file)?;
            writeln!(file, "OMITTED PACKAGES (tree is incomplete):")?;
            for missing in &report.missing_packages {
                writeln!(file, "  {}: {}", missing.package, missing.reason)?;
            }
        }

        Ok(())
    }
}
