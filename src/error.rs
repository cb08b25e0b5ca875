use thiserror::Error;

#[derive(Error, Debug)]
pub enum GetfwError {
    #[error("Invalid Windows source root: {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("Firmware package '{package}' not found in driver store (prefix: {prefix})")]
    MissingPackage { package: String, prefix: String },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for GetfwError {
    fn user_message(&self) -> String {
        match self {
            GetfwError::InvalidSource { path, reason } => {
                format!("Invalid Windows source root '{}': {}", path, reason)
            }
            GetfwError::MissingPackage { package, prefix } => {
                format!(
                    "Firmware package '{}' not found (looked for driver package '{}*')",
                    package, prefix
                )
            }
            GetfwError::Write { path, source } => {
                format!("Failed to write '{}': {}", path, source)
            }
            GetfwError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            GetfwError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            GetfwError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            GetfwError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            GetfwError::InvalidSource { .. } => Some(
                "Point --windows at a mounted Windows installation or recovery image. \
                 The directory must contain Windows/System32/DriverStore/FileRepository. \
                 BitLocker-protected volumes must be unlocked first."
                    .to_string(),
            ),
            GetfwError::MissingPackage { .. } => Some(
                "The Windows image may be too old or may not be a Surface Pro X (SQ2) image. \
                 Use '--missing warn' to extract the remaining packages anyway, or '--skip' \
                 to exclude packages you do not need."
                    .to_string(),
            ),
            GetfwError::Write { .. } => Some(
                "Ensure the output directory is on a writable filesystem with enough free \
                 space, then re-run."
                    .to_string(),
            ),
            GetfwError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present."
                    .to_string(),
            ),
            GetfwError::Permission { .. } => Some(
                "Ensure you have read access to the mounted Windows image and write access \
                 to the output directory."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for GetfwError {
    fn from(error: toml::de::Error) -> Self {
        GetfwError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GetfwError>;

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = GetfwError::InvalidSource {
            path: "/mnt/nowhere".to_string(),
            reason: "directory does not exist".to_string(),
        };
        assert!(error.user_message().contains("Invalid Windows source root"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_missing_package_message_names_prefix() {
        let error = GetfwError::MissingPackage {
            package: "bluetooth".to_string(),
            prefix: "qcbtfmuart8180".to_string(),
        };
        assert!(error.user_message().contains("bluetooth"));
        assert!(error.user_message().contains("qcbtfmuart8180"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(500), "500 B");
    }
}
