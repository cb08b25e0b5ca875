//! Compiled-in catalog of firmware packages shipped in the Windows driver
//! store of a Surface Pro X (SQ2, SC8180X) installation.
//!
//! Each package names a driver-package directory prefix inside
//! `Windows/System32/DriverStore/FileRepository` and maps the files it
//! contains to their normalized locations in the output tree.

/// Relative path of the driver store inside a mounted Windows root.
pub const FILE_REPOSITORY: &str = "Windows/System32/DriverStore/FileRepository";

/// Platform subdirectory used for qcom vendor firmware.
pub const PATH_PLATFORM: &str = "qcom/msft/surface/pro-x-sq2";

/// A single file of a firmware package: source name inside the driver
/// package directory, target path relative to the package target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMapping {
    pub source: &'static str,
    pub target: &'static str,
}

/// An alias created after extraction, both sides relative to the package
/// target directory. The link side never shadows an extracted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasLink {
    pub link: &'static str,
    pub target: &'static str,
}

/// A firmware package known to exist in the driver store.
#[derive(Debug, Clone, Copy)]
pub struct FirmwarePackage {
    /// Catalog name, e.g. `wlan/ath10k/board`.
    pub name: &'static str,
    /// Driver-package directory prefix, e.g. `qcwlan8180`. The actual
    /// directory carries an INF hash suffix that varies between images.
    pub prefix: &'static str,
    /// Target directory relative to the output root.
    pub target_dir: &'static str,
    pub files: &'static [FileMapping],
    pub links: &'static [AliasLink],
}

impl FirmwarePackage {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

macro_rules! identity_files {
    ($($name:literal),+ $(,)?) => {
        &[$(FileMapping { source: $name, target: $name }),+]
    };
}

const BLUETOOTH_FILES: &[FileMapping] = identity_files![
    "crbtfw21.tlv",
    "crnv21.b3c",
    "crnv21.b44",
    "crnv21.b45",
    "crnv21.b46",
    "crnv21.b47",
    "crnv21.b71",
    "crnv21.bin",
];

// The chip reports revision 0x01, but the Windows driver only ships 0x21
// files. There is no separate 0x01 firmware; the 0x21 images work.
const BLUETOOTH_LINKS: &[AliasLink] = &[
    AliasLink { link: "crbtfw01.tlv", target: "crbtfw21.tlv" },
    AliasLink { link: "crnv01.b3c", target: "crnv21.b3c" },
    AliasLink { link: "crnv01.b44", target: "crnv21.b44" },
    AliasLink { link: "crnv01.b45", target: "crnv21.b45" },
    AliasLink { link: "crnv01.b46", target: "crnv21.b46" },
    AliasLink { link: "crnv01.b47", target: "crnv21.b47" },
    AliasLink { link: "crnv01.b71", target: "crnv21.b71" },
    AliasLink { link: "crnv01.bin", target: "crnv21.bin" },
];

const GPU_VENDOR_FILES: &[FileMapping] = identity_files![
    "qcdxkmsuc8180.mbn",
    "qcvss8180.mbn",
];

const WLAN_VENDOR_FILES: &[FileMapping] = identity_files!["wlanmdsp.mbn"];

const WLAN_BOARD_FILES: &[FileMapping] = identity_files![
    "bdwlan.b5f",
    "bdwlan.b36",
    "bdwlan.b37",
    "bdwlan.b46",
    "bdwlan.b47",
    "bdwlan.b48",
    "bdwlan.b58",
    "bdwlan.b71",
    "bdwlan.bin",
    "bdwlanu.b5f",
    "bdwlanu.b58",
];

// File map taken from the surfaceprox_mcfg INF: Windows installs the modem
// configuration database as opaquely numbered MCFG.n files.
const MCFG_FILES: &[FileMapping] = &[
    FileMapping { source: "MCFG/MCFG.1", target: "modem_pr/mcfg/configs/mcfg_sw/oem_sw.txt" },
    FileMapping { source: "MCFG/MCFG.2", target: "modem_pr/mcfg/configs/mcfg_sw/mbn_sw.txt" },
    FileMapping { source: "MCFG/MCFG.3", target: "modem_pr/mcfg/configs/mcfg_sw/mbn_sw.dig" },
    FileMapping { source: "MCFG/MCFG.4", target: "modem_pr/mcfg/configs/mcfg_sw/generic/APAC/DCM/Commercial/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.5", target: "modem_pr/mcfg/configs/mcfg_sw/generic/APAC/SBM/Commercial/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.6", target: "modem_pr/mcfg/configs/mcfg_sw/generic/common/ROW/Commercial/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.7", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/CMCC/Commercial/MSFT_OpenMkt/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.8", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/CT/Commercial/MSFT_OpenMkt/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.9", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/CU/Commercial/MSFT_OpenMkt/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.10", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/GIGSKY/Commercial/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.11", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/mte/factory/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.12", target: "modem_pr/mcfg/configs/mcfg_sw/generic/Microsoft/Cambria/SW/rel/sc8180x.gen.prod/common/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.13", target: "modem_pr/mcfg/configs/mcfg_sw/generic/NA/ATT/FirstNet/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.14", target: "modem_pr/mcfg/configs/mcfg_sw/generic/NA/ATT/Non_VoLTE/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.15", target: "modem_pr/mcfg/configs/mcfg_sw/generic/NA/Verizon/CDMAless/mcfg_sw.mbn" },
    FileMapping { source: "MCFG/MCFG.16", target: "modem_pr/mcfg/configs/mcfg_hw/mbn_hw.txt" },
    FileMapping { source: "MCFG/MCFG.17", target: "modem_pr/mcfg/configs/mcfg_hw/mbn_hw.dig" },
    FileMapping { source: "MCFG/MCFG.18", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/cmcc_subsidized/SR_DSDS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.19", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/LA/7+7_mode/SR_DSDS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.20", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/LA/DSDS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.21", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/LA/SS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.22", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/WD/7+7_mode/SR_DSDS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.23", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/WD/DSSA/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.24", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/WD/SS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.25", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/WP8/7+7_mode/SR_DSDS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.26", target: "modem_pr/mcfg/configs/mcfg_hw/generic/common/SC8180X/WP8/SS/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.27", target: "modem_pr/mcfg/configs/mcfg_hw/generic/Microsoft/Cambria/hw/mte/factory/mcfg_hw.mbn" },
    FileMapping { source: "MCFG/MCFG.28", target: "modem_pr/mcfg/configs/mcfg_hw/generic/Microsoft/Cambria/hw/rel/sc8180x.gen.prod/common/mcfg_hw.mbn" },
];

const ADSP_FILES: &[FileMapping] = identity_files!["qcadsp8180.mbn"];
const CDSP_FILES: &[FileMapping] = identity_files!["qccdsp8180.mbn"];

const MPSS_VENDOR_FILES: &[FileMapping] = identity_files![
    "qcmpss8180.mbn",
    "qcmpss8180_nm.mbn",
];

const MPSS_LIBRARY_FILES: &[FileMapping] = identity_files!["qdsp6m.qdb"];

/// All firmware packages known for this platform, in extraction order.
pub const CATALOG: &[FirmwarePackage] = &[
    FirmwarePackage {
        name: "bluetooth",
        prefix: "qcbtfmuart8180",
        target_dir: "qca",
        files: BLUETOOTH_FILES,
        links: BLUETOOTH_LINKS,
    },
    FirmwarePackage {
        name: "gpu/vendor",
        prefix: "qcdx8180",
        target_dir: PATH_PLATFORM,
        files: GPU_VENDOR_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "wlan/vendor",
        prefix: "qcwlan8180",
        target_dir: PATH_PLATFORM,
        files: WLAN_VENDOR_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "wlan/ath10k/board",
        prefix: "qcwlan8180",
        target_dir: "ath10k/WCN3990/hw1.0/boards",
        files: WLAN_BOARD_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "mcfg",
        prefix: "surfaceprox_mcfg",
        target_dir: PATH_PLATFORM,
        files: MCFG_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "adsp/vendor",
        prefix: "surfaceprox_subextadsp",
        target_dir: PATH_PLATFORM,
        files: ADSP_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "cdsp/vendor",
        prefix: "surfaceprox_subextcdsp",
        target_dir: PATH_PLATFORM,
        files: CDSP_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "mpss/vendor",
        prefix: "surfaceprox_subextmpss",
        target_dir: PATH_PLATFORM,
        files: MPSS_VENDOR_FILES,
        links: &[],
    },
    FirmwarePackage {
        name: "mpss/library",
        prefix: "surfaceprox_subextmpss",
        target_dir: PATH_PLATFORM,
        files: MPSS_LIBRARY_FILES,
        links: &[],
    },
];

/// Look up a catalog package by name.
pub fn find_package(name: &str) -> Option<&'static FirmwarePackage> {
    CATALOG.iter().find(|p| p.name == name)
}

/// Total number of files the full catalog extracts.
pub fn total_file_count() -> usize {
    CATALOG.iter().map(FirmwarePackage::file_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = CATALOG.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_find_package() {
        let pkg = find_package("bluetooth").unwrap();
        assert_eq!(pkg.prefix, "qcbtfmuart8180");
        assert_eq!(pkg.target_dir, "qca");
        assert!(find_package("no-such-package").is_none());
    }

    #[test]
    fn test_target_paths_are_relative_and_clean() {
        for pkg in CATALOG {
            assert!(!pkg.target_dir.starts_with('/'), "{}", pkg.name);
            for file in pkg.files {
                assert!(!file.target.starts_with('/'), "{}", file.target);
                assert!(!file.target.contains(".."), "{}", file.target);
            }
        }
    }

    #[test]
    fn test_mcfg_rename_map() {
        let pkg = find_package("mcfg").unwrap();
        assert_eq!(pkg.file_count(), 28);
        assert_eq!(pkg.files[0].source, "MCFG/MCFG.1");
        assert_eq!(
            pkg.files[0].target,
            "modem_pr/mcfg/configs/mcfg_sw/oem_sw.txt"
        );
    }

    #[test]
    fn test_alias_links_point_at_extracted_files() {
        for pkg in CATALOG {
            let targets: HashSet<_> = pkg.files.iter().map(|f| f.target).collect();
            for link in pkg.links {
                assert!(
                    targets.contains(link.target),
                    "alias target {} not extracted by {}",
                    link.target,
                    pkg.name
                );
                assert!(
                    !targets.contains(link.link),
                    "alias {} shadows an extracted file of {}",
                    link.link,
                    pkg.name
                );
            }
        }
    }

    #[test]
    fn test_total_file_count() {
        assert_eq!(total_file_count(), 8 + 2 + 1 + 11 + 28 + 1 + 1 + 2 + 1);
    }
}
