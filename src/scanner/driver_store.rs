use crate::error::{GetfwError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read-only view of the Windows Driver Store File Repository inside a
/// mounted image. Opening it validates the source root; resolution then
/// works off a single sorted snapshot of the package directories.
pub struct DriverStore {
    repository: PathBuf,
    package_dirs: Vec<PathBuf>,
}

impl DriverStore {
    /// Validate `windows_root` and snapshot the driver-package directories.
    ///
    /// `file_repository` is the store location relative to the root;
    /// `exclude_patterns` are regexes matched against package directory
    /// names to drop stale or broken copies from resolution.
    pub fn open(
        windows_root: &Path,
        file_repository: &Path,
        exclude_patterns: &[String],
    ) -> Result<Self> {
        if !windows_root.exists() {
            return Err(GetfwError::InvalidSource {
                path: windows_root.display().to_string(),
                reason: "directory does not exist".to_string(),
            });
        }

        if !windows_root.is_dir() {
            return Err(GetfwError::InvalidSource {
                path: windows_root.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let repository = Self::locate_repository(windows_root, file_repository)?;

        let exclude: Vec<Regex> = exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        let mut package_dirs = Vec::new();
        let walker = WalkDir::new(&repository)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        for entry in walker {
            // An unreadable driver store means an unusable source root.
            let entry = entry.map_err(|e| GetfwError::InvalidSource {
                path: repository.display().to_string(),
                reason: e.to_string(),
            })?;

            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if exclude.iter().any(|pattern| pattern.is_match(&name)) {
                continue;
            }

            package_dirs.push(entry.into_path());
        }

        // Sorted snapshot so ambiguous prefix matches resolve identically
        // across runs, independent of filesystem enumeration order.
        package_dirs.sort();

        Ok(Self {
            repository,
            package_dirs,
        })
    }

    /// The Windows path components on disk may differ in case from the
    /// canonical spelling when the image was copied onto a case-sensitive
    /// filesystem, so each component is matched case-insensitively.
    fn locate_repository(windows_root: &Path, file_repository: &Path) -> Result<PathBuf> {
        let mut current = windows_root.to_path_buf();

        for component in file_repository.components() {
            let wanted = component.as_os_str().to_string_lossy().to_lowercase();

            let next = std::fs::read_dir(&current)
                .map_err(|e| GetfwError::InvalidSource {
                    path: windows_root.display().to_string(),
                    reason: e.to_string(),
                })?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .find(|path| {
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase() == wanted)
                        .unwrap_or(false)
                });

            current = next.ok_or_else(|| GetfwError::InvalidSource {
                path: windows_root.display().to_string(),
                reason: format!(
                    "does not look like a Windows root ({} not found)",
                    file_repository.display()
                ),
            })?;
        }

        Ok(current)
    }

    pub fn repository_path(&self) -> &Path {
        &self.repository
    }

    pub fn package_count(&self) -> usize {
        self.package_dirs.len()
    }

    /// Find the driver-package directory for a catalog prefix.
    ///
    /// Driver package directories are named `<inf>.inf_arm64_<hash>`; the
    /// hash varies between images, so the catalog only pins the prefix.
    /// Matching is case-insensitive and the lexicographically smallest
    /// candidate wins, keeping resolution deterministic.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&Path> {
        let prefix_lower = prefix.to_lowercase();

        self.package_dirs
            .iter()
            .find(|dir| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().starts_with(&prefix_lower))
                    .unwrap_or(false)
            })
            .map(PathBuf::as_path)
    }

    /// Locate a mapped file inside a resolved package directory, matching
    /// each path component case-insensitively.
    pub fn find_file(&self, package_dir: &Path, relative: &str) -> Option<PathBuf> {
        let mut current = package_dir.to_path_buf();

        for component in relative.split('/') {
            let wanted = component.to_lowercase();

            let next = std::fs::read_dir(&current)
                .ok()?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .find(|path| {
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_lowercase() == wanted)
                        .unwrap_or(false)
                })?;

            current = next;
        }

        current.is_file().then_some(current)
    }
}
