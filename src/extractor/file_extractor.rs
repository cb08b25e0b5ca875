use crate::error::{GetfwError, Result};
use crate::scanner::{ExtractEntry, ExtractionPlan, PlannedLink};
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub files_processed: usize,
    pub total_files: usize,
    pub bytes_processed: u64,
    pub total_bytes: u64,
    pub current_file: Option<String>,
    pub start_time: Instant,
    pub links_created: usize,
}

impl ExtractionProgress {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            files_processed: 0,
            total_files,
            bytes_processed: 0,
            total_bytes,
            current_file: None,
            start_time: Instant::now(),
            links_created: 0,
        }
    }

    pub fn update_file(&mut self, filename: String, bytes: u64) {
        self.files_processed += 1;
        self.bytes_processed += bytes;
        self.current_file = Some(filename);
    }

    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.files_processed as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

pub struct FileOperations {
    preserve_mtimes: bool,
    buffer_size: usize,
}

impl FileOperations {
    pub fn new() -> Self {
        Self {
            preserve_mtimes: true,
            buffer_size: 64 * 1024,
        }
    }

    pub fn with_preserve_mtimes(mut self, preserve: bool) -> Self {
        self.preserve_mtimes = preserve;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Copy every plan entry into the output tree, then create the alias
    /// links. Any copy failure aborts the run; a half-written firmware tree
    /// must never look complete.
    pub fn extract_plan(
        &self,
        plan: &ExtractionPlan,
        output_root: &Path,
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<ExtractionProgress> {
        let mut progress = ExtractionProgress::new(plan.entries.len(), plan.total_bytes());

        if !output_root.exists() {
            fs::create_dir_all(output_root).map_err(|e| GetfwError::Write {
                path: output_root.display().to_string(),
                source: e,
            })?;
        }

        for entry in &plan.entries {
            if let Some(callback) = progress_callback {
                callback(&progress);
            }

            let bytes_copied = self.copy_entry(entry, output_root)?;
            progress.update_file(entry.target_path.display().to_string(), bytes_copied);
        }

        for link in &plan.links {
            self.create_alias(link, output_root)?;
            progress.links_created += 1;
        }

        if let Some(callback) = progress_callback {
            callback(&progress);
        }

        Ok(progress)
    }

    fn copy_entry(&self, entry: &ExtractEntry, output_root: &Path) -> Result<u64> {
        let dest_path = output_root.join(&entry.target_path);
        validate_destination_path(&entry.target_path)?;

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| GetfwError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        if !entry.source_path.is_file() {
            return Err(GetfwError::InvalidPath {
                path: format!(
                    "Source is not a regular file: {}",
                    entry.source_path.display()
                ),
            });
        }

        self.copy_file_with_buffer(&entry.source_path, &dest_path)
    }

    fn copy_file_with_buffer(&self, source: &Path, dest: &Path) -> Result<u64> {
        let source_file = fs::File::open(source)?;
        let dest_file = fs::File::create(dest).map_err(|e| GetfwError::Write {
            path: dest.display().to_string(),
            source: e,
        })?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| GetfwError::Write {
                    path: dest.display().to_string(),
                    source: e,
                })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().map_err(|e| GetfwError::Write {
            path: dest.display().to_string(),
            source: e,
        })?;

        if self.preserve_mtimes {
            if let Ok(source_metadata) = fs::metadata(source) {
                if let Ok(modified_time) = source_metadata.modified() {
                    let _ = filetime::set_file_mtime(
                        dest,
                        filetime::FileTime::from_system_time(modified_time),
                    );
                }
            }
        }

        Ok(total_bytes)
    }

    /// Symlinks on Unix so the aliases survive in a packaged firmware tree;
    /// plain copies elsewhere.
    fn create_alias(&self, link: &PlannedLink, output_root: &Path) -> Result<()> {
        let link_path = output_root.join(&link.link_path);
        let target_path = link_path
            .parent()
            .map(|p| p.join(&link.target_name))
            .ok_or_else(|| GetfwError::InvalidPath {
                path: link.link_path.display().to_string(),
            })?;

        if !target_path.exists() {
            return Err(GetfwError::InvalidPath {
                path: format!(
                    "Alias target does not exist: {}",
                    target_path.display()
                ),
            });
        }

        if link_path.exists() || link_path.is_symlink() {
            fs::remove_file(&link_path).map_err(|e| GetfwError::Write {
                path: link_path.display().to_string(),
                source: e,
            })?;
        }

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&link.target_name, &link_path).map_err(|e| {
                GetfwError::Write {
                    path: link_path.display().to_string(),
                    source: e,
                }
            })?;
        }

        #[cfg(not(unix))]
        {
            self.copy_file_with_buffer(&target_path, &link_path)?;
        }

        Ok(())
    }
}

impl Default for FileOperations {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_destination_path(path: &Path) -> Result<()> {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(GetfwError::InvalidPath {
            path: format!("Directory traversal not allowed: {}", path.display()),
        });
    }

    if path.as_os_str().len() > 4096 {
        return Err(GetfwError::InvalidPath {
            path: format!("Path too long: {} characters", path.as_os_str().len()),
        });
    }

    Ok(())
}
