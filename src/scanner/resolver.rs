use crate::catalog::{FirmwarePackage, CATALOG};
use crate::config::{MissingAction, PolicyConfig};
use crate::error::{GetfwError, Result};
use crate::scanner::DriverStore;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// One file of the extraction plan: where it lives in the driver store and
/// where it goes in the output tree.
#[derive(Debug, Clone)]
pub struct ExtractEntry {
    pub package: &'static str,
    pub source_path: PathBuf,
    /// Target path relative to the output root.
    pub target_path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// An alias to create after the copy pass. The link target is a file name
/// in the same directory, so the tree stays relocatable.
#[derive(Debug, Clone)]
pub struct PlannedLink {
    pub package: &'static str,
    /// Link path relative to the output root.
    pub link_path: PathBuf,
    pub target_name: String,
}

#[derive(Debug, Clone)]
pub struct MissingReport {
    pub package: String,
    pub reason: String,
}

/// Fully resolved extraction plan. Built before anything is written so a
/// resolution failure under the fail policy never leaves a partial tree.
#[derive(Debug, Default)]
pub struct ExtractionPlan {
    pub entries: Vec<ExtractEntry>,
    pub links: Vec<PlannedLink>,
    pub missing: Vec<MissingReport>,
}

impl ExtractionPlan {
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct PackageResolver<'a> {
    store: &'a DriverStore,
    policy: &'a PolicyConfig,
}

impl<'a> PackageResolver<'a> {
    pub fn new(store: &'a DriverStore, policy: &'a PolicyConfig) -> Self {
        Self { store, policy }
    }

    /// Resolve the whole catalog against the driver store.
    ///
    /// A package counts as missing when its driver-package directory cannot
    /// be found or any of its mapped files is absent; an incomplete package
    /// is never extracted partially.
    pub fn resolve(&self) -> Result<ExtractionPlan> {
        let mut plan = ExtractionPlan::default();

        for package in CATALOG {
            if self.policy.skip.iter().any(|s| s == package.name) {
                continue;
            }

            match self.resolve_package(package) {
                Ok((entries, links)) => {
                    plan.entries.extend(entries);
                    plan.links.extend(links);
                }
                Err(reason) => match self.policy.missing {
                    MissingAction::Fail => {
                        return Err(GetfwError::MissingPackage {
                            package: package.name.to_string(),
                            prefix: package.prefix.to_string(),
                        });
                    }
                    MissingAction::Warn => {
                        plan.missing.push(MissingReport {
                            package: package.name.to_string(),
                            reason,
                        });
                    }
                },
            }
        }

        // Consistent output order regardless of catalog ordering.
        plan.entries.sort_by(|a, b| a.target_path.cmp(&b.target_path));
        plan.links.sort_by(|a, b| a.link_path.cmp(&b.link_path));

        Ok(plan)
    }

    fn resolve_package(
        &self,
        package: &FirmwarePackage,
    ) -> std::result::Result<(Vec<ExtractEntry>, Vec<PlannedLink>), String> {
        let package_dir = self
            .store
            .resolve_prefix(package.prefix)
            .ok_or_else(|| format!("no driver package matching '{}*'", package.prefix))?;

        let mut entries = Vec::with_capacity(package.files.len());

        for file in package.files {
            let source_path = self
                .store
                .find_file(package_dir, file.source)
                .ok_or_else(|| {
                    format!(
                        "file '{}' missing from {}",
                        file.source,
                        package_dir.display()
                    )
                })?;

            let metadata = std::fs::metadata(&source_path)
                .map_err(|e| format!("cannot stat '{}': {}", source_path.display(), e))?;

            let target_path = Path::new(package.target_dir).join(file.target);
            validate_target_path(&target_path)
                .map_err(|e| format!("bad target path: {}", e))?;

            entries.push(ExtractEntry {
                package: package.name,
                source_path,
                target_path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        let links = package
            .links
            .iter()
            .map(|link| PlannedLink {
                package: package.name,
                link_path: Path::new(package.target_dir).join(link.link),
                target_name: link.target.to_string(),
            })
            .collect();

        Ok((entries, links))
    }
}

fn validate_target_path(path: &Path) -> std::result::Result<(), String> {
    if path.is_absolute() {
        return Err(format!("absolute path: {}", path.display()));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(format!(
            "parent directory reference: {}",
            path.display()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn fake_root_with(packages: &[(&str, &[&str])]) -> TempDir {
        let temp = TempDir::new().unwrap();
        let repo = temp
            .path()
            .join("Windows/System32/DriverStore/FileRepository");
        fs::create_dir_all(&repo).unwrap();

        for (dir, files) in packages {
            let pkg = repo.join(dir);
            for file in *files {
                let path = pkg.join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, format!("firmware:{}", file)).unwrap();
            }
        }

        temp
    }

    fn open_store(root: &Path) -> DriverStore {
        DriverStore::open(
            root,
            Path::new(catalog::FILE_REPOSITORY),
            &[],
        )
        .unwrap()
    }

    fn bluetooth_source_files() -> Vec<&'static str> {
        catalog::find_package("bluetooth")
            .unwrap()
            .files
            .iter()
            .map(|f| f.source)
            .collect()
    }

    #[test]
    fn test_resolves_single_package() {
        let files = bluetooth_source_files();
        let temp = fake_root_with(&[("qcbtfmuart8180.inf_arm64_abcd", files.as_slice())]);
        let store = open_store(temp.path());

        let policy = PolicyConfig {
            missing: MissingAction::Warn,
            ..Default::default()
        };
        let plan = PackageResolver::new(&store, &policy).resolve().unwrap();

        let bt_entries: Vec<_> = plan
            .entries
            .iter()
            .filter(|e| e.package == "bluetooth")
            .collect();
        assert_eq!(bt_entries.len(), files.len());
        assert!(bt_entries
            .iter()
            .all(|e| e.target_path.starts_with("qca")));
        assert_eq!(plan.links.len(), 8);
    }

    #[test]
    fn test_missing_package_fails_fast_by_default() {
        let temp = fake_root_with(&[]);
        let store = open_store(temp.path());

        let policy = PolicyConfig::default();
        let result = PackageResolver::new(&store, &policy).resolve();

        assert!(matches!(
            result,
            Err(GetfwError::MissingPackage { .. })
        ));
    }

    #[test]
    fn test_missing_package_recorded_under_warn() {
        let temp = fake_root_with(&[]);
        let store = open_store(temp.path());

        let policy = PolicyConfig {
            missing: MissingAction::Warn,
            ..Default::default()
        };
        let plan = PackageResolver::new(&store, &policy).resolve().unwrap();

        assert!(plan.entries.is_empty());
        assert!(!plan.is_complete());
        assert_eq!(plan.missing.len(), catalog::CATALOG.len());
    }

    #[test]
    fn test_incomplete_package_is_not_extracted_partially() {
        // Package directory present but only one of the mapped files.
        let temp = fake_root_with(&[("qcbtfmuart8180.inf_arm64_abcd", &["crbtfw21.tlv"])]);
        let store = open_store(temp.path());

        let policy = PolicyConfig {
            missing: MissingAction::Warn,
            ..Default::default()
        };
        let plan = PackageResolver::new(&store, &policy).resolve().unwrap();

        assert!(plan.entries.iter().all(|e| e.package != "bluetooth"));
        assert!(plan
            .missing
            .iter()
            .any(|m| m.package == "bluetooth" && m.reason.contains("missing")));
    }

    #[test]
    fn test_skip_list_is_honored() {
        let temp = fake_root_with(&[]);
        let store = open_store(temp.path());

        let policy = PolicyConfig {
            missing: MissingAction::Warn,
            skip: catalog::CATALOG.iter().map(|p| p.name.to_string()).collect(),
            ..Default::default()
        };
        let plan = PackageResolver::new(&store, &policy).resolve().unwrap();

        assert!(plan.entries.is_empty());
        assert!(plan.missing.is_empty());
        assert!(plan.is_complete());
    }

    #[test]
    fn test_mcfg_files_are_renamed() {
        let temp = fake_root_with(&[(
            "surfaceprox_mcfg.inf_arm64_9999",
            &["MCFG/MCFG.1"],
        )]);
        let store = open_store(temp.path());

        // Only MCFG.1 exists, so mcfg itself is incomplete; resolve just
        // that file through the store to check the rename.
        let pkg_dir = store.resolve_prefix("surfaceprox_mcfg").unwrap();
        assert!(store.find_file(pkg_dir, "MCFG/MCFG.1").is_some());

        let mcfg = catalog::find_package("mcfg").unwrap();
        assert_eq!(
            Path::new(mcfg.target_dir).join(mcfg.files[0].target),
            Path::new("qcom/msft/surface/pro-x-sq2/modem_pr/mcfg/configs/mcfg_sw/oem_sw.txt")
        );
    }

    #[test]
    fn test_validate_target_path() {
        assert!(validate_target_path(Path::new("qca/file.bin")).is_ok());
        assert!(validate_target_path(Path::new("../escape")).is_err());
        assert!(validate_target_path(Path::new("/absolute")).is_err());
    }

    #[test]
    fn test_plan_total_bytes() {
        let files = bluetooth_source_files();
        let temp = fake_root_with(&[("qcbtfmuart8180.inf_arm64_abcd", files.as_slice())]);
        let store = open_store(temp.path());

        let policy = PolicyConfig {
            missing: MissingAction::Warn,
            ..Default::default()
        };
        let plan = PackageResolver::new(&store, &policy).resolve().unwrap();

        let expected: u64 = plan.entries.iter().map(|e| e.size).sum();
        assert_eq!(plan.total_bytes(), expected);
        assert!(plan.total_bytes() > 0);
    }
}
