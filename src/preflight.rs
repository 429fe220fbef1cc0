//! Preconditions checked before any step runs.

use tracing::debug;

use crate::error::{Result, SetupError};
use crate::shell::{Host, OsRelease};

/// Ubuntu releases the step catalogue is written for.
pub const SUPPORTED_UBUNTU_RELEASES: &[&str] = &["22.04", "24.04"];

/// Fail unless the process runs as root.
pub fn require_elevated(elevated: bool) -> Result<()> {
    if elevated {
        Ok(())
    } else {
        Err(SetupError::NotElevated)
    }
}

/// Fail unless `release` is a supported Ubuntu release.
pub fn check_release(release: &OsRelease) -> Result<()> {
    if release.id != "ubuntu" {
        return Err(SetupError::UnsupportedOs {
            message: format!("requires Ubuntu, found '{}'", release.id),
        });
    }

    if !SUPPORTED_UBUNTU_RELEASES.contains(&release.version_id.as_str()) {
        return Err(SetupError::UnsupportedOs {
            message: format!(
                "requires Ubuntu {}, found {}",
                SUPPORTED_UBUNTU_RELEASES.join(" or "),
                release.version_id
            ),
        });
    }

    Ok(())
}

/// Read `/etc/os-release` under the host root and validate it.
pub fn check_os(host: &Host<'_>) -> Result<OsRelease> {
    let path = host.path("/etc/os-release");
    let release = OsRelease::load(&path).map_err(|e| SetupError::UnsupportedOs {
        message: format!("{:#}", e),
    })?;

    check_release(&release)?;
    debug!("Ubuntu {} detected", release.version_id);
    Ok(release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::MockRunner;
    use std::fs;
    use tempfile::TempDir;

    fn release(id: &str, version: &str) -> OsRelease {
        OsRelease {
            id: id.into(),
            version_id: version.into(),
            codename: None,
        }
    }

    #[test]
    fn elevation_required() {
        assert!(require_elevated(true).is_ok());
        assert!(matches!(
            require_elevated(false),
            Err(SetupError::NotElevated)
        ));
    }

    #[test]
    fn supported_releases_pass() {
        assert!(check_release(&release("ubuntu", "22.04")).is_ok());
        assert!(check_release(&release("ubuntu", "24.04")).is_ok());
    }

    #[test]
    fn other_distributions_fail() {
        let err = check_release(&release("debian", "12")).unwrap_err();
        assert!(err.to_string().contains("debian"));
        assert!(matches!(err, SetupError::UnsupportedOs { .. }));
    }

    #[test]
    fn unsupported_ubuntu_fails() {
        let err = check_release(&release("ubuntu", "20.04")).unwrap_err();
        assert!(err.to_string().contains("20.04"));
    }

    #[test]
    fn reads_os_release_under_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("etc")).unwrap();
        fs::write(
            temp.path().join("etc/os-release"),
            "ID=ubuntu\nVERSION_ID=\"24.04\"\nVERSION_CODENAME=noble\n",
        )
        .unwrap();

        let runner = MockRunner::new();
        let host = Host::with_root(&runner, temp.path());
        let release = check_os(&host).unwrap();
        assert_eq!(release.codename.as_deref(), Some("noble"));
    }

    #[test]
    fn missing_os_release_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let host = Host::with_root(&runner, temp.path());
        assert!(matches!(
            check_os(&host),
            Err(SetupError::UnsupportedOs { .. })
        ));
    }
}
