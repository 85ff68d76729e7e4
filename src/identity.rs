//! Machine identity.
//!
//! Records are tagged with a stable per-host identifier read once at startup
//! from the systemd machine-id file. There is no sensible fallback identity,
//! so failure here is fatal.

use std::path::Path;

use crate::error::{AppResult, MonitorError};

/// Default machine identity source.
pub const DEFAULT_MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Read and trim the machine identifier from `path`.
///
/// An unreadable or empty file is [`MonitorError::IdentityUnavailable`].
pub fn load_machine_id(path: &Path) -> AppResult<String> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        MonitorError::IdentityUnavailable(format!("{}: {err}", path.display()))
    })?;
    let id = raw.trim();
    if id.is_empty() {
        return Err(MonitorError::IdentityUnavailable(format!(
            "{}: file is empty",
            path.display()
        )));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_and_trims_identifier() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0123456789abcdef0123456789abcdef").unwrap();
        let id = load_machine_id(file.path()).unwrap();
        assert_eq!(id, "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn missing_file_is_identity_unavailable() {
        let err = load_machine_id(Path::new("/nonexistent/machine-id")).unwrap_err();
        assert!(matches!(err, MonitorError::IdentityUnavailable(_)));
    }

    #[test]
    fn empty_file_is_identity_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_machine_id(file.path()).unwrap_err();
        assert!(matches!(err, MonitorError::IdentityUnavailable(_)));
    }
}
