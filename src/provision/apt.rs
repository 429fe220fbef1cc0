//! apt/dpkg helpers shared by the package steps.

use std::fs;

use tracing::debug;

use crate::config::EnvFileParser;
use crate::error::Result;
use crate::shell::{CommandResult, CommandSpec, Host};
use crate::steps::Remediation;

const KEYRING_DIR: &str = "/etc/apt/keyrings";

/// Whether dpkg reports `package` as installed.
pub fn is_installed(host: &Host<'_>, package: &str) -> bool {
    let result = host.run(
        &CommandSpec::new("dpkg-query")
            .arg("-W")
            .arg("-f=${Status}")
            .arg(package),
    );
    result.success() && result.stdout.contains("install ok installed")
}

/// The subset of `packages` that is not installed, in the given order.
pub fn missing(host: &Host<'_>, packages: &[&str]) -> Vec<String> {
    packages
        .iter()
        .filter(|p| !is_installed(host, p))
        .map(|p| p.to_string())
        .collect()
}

fn apt_get() -> CommandSpec {
    CommandSpec::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive")
}

/// Refresh the package index.
pub fn update(host: &Host<'_>) -> CommandResult {
    host.run(&apt_get().arg("update"))
}

/// Install packages non-interactively.
pub fn install<S: AsRef<str>>(host: &Host<'_>, packages: &[S]) -> CommandResult {
    host.run(
        &apt_get()
            .args(["install", "-y"])
            .args(packages.iter().map(|p| p.as_ref().to_string())),
    )
}

/// Install packages, mapping a failed install to a remediation failure.
pub fn install_or_fail<S: AsRef<str>>(host: &Host<'_>, packages: &[S]) -> Remediation {
    let result = install(host, packages);
    if result.success() {
        Remediation::done()
    } else {
        let names: Vec<&str> = packages.iter().map(|p| p.as_ref()).collect();
        Remediation::Failure(format!(
            "apt-get install {} failed ({}); try: sudo apt --fix-broken install",
            names.join(" "),
            result.failure_summary()
        ))
    }
}

/// Release codename (`noble`, `jammy`) of the host.
pub fn codename(host: &Host<'_>) -> Option<String> {
    let result = host.run(&CommandSpec::new("lsb_release").arg("-cs"));
    let from_lsb = result.stdout.trim();
    if result.success() && !from_lsb.is_empty() {
        return Some(from_lsb.to_string());
    }

    let vars = EnvFileParser::load_optional(&host.path("/etc/os-release")).ok()?;
    vars.get("VERSION_CODENAME")
        .or_else(|| vars.get("UBUNTU_CODENAME"))
        .filter(|c| !c.is_empty())
        .cloned()
}

/// A third-party apt repository signed by a downloaded key.
#[derive(Debug, Clone, Copy)]
pub struct AptRepository {
    /// Short name, used for the keyring and source-list file names.
    pub name: &'static str,
    /// URL of the ASCII-armored signing key.
    pub key_url: &'static str,
    /// Repository base URL.
    pub url: &'static str,
    /// Suite suffix appended to the codename (`-pgdg`), if any.
    pub suite_suffix: &'static str,
}

impl AptRepository {
    pub fn keyring_path(&self) -> String {
        format!("{}/{}.asc", KEYRING_DIR, self.name)
    }

    pub fn source_list_path(&self) -> String {
        format!("/etc/apt/sources.list.d/{}.list", self.name)
    }

    /// The `deb` line for `codename`.
    pub fn source_line(&self, codename: &str) -> String {
        format!(
            "deb [signed-by={}] {} {}{} main\n",
            self.keyring_path(),
            self.url,
            codename,
            self.suite_suffix
        )
    }

    /// Download the key, write the source list and refresh the index.
    ///
    /// Filesystem errors are returned as `Err`; command failures become
    /// [`Remediation::Failure`].
    pub fn add(&self, host: &Host<'_>) -> Result<Remediation> {
        let key = host.run(&CommandSpec::new("curl").args(["-fsSL", self.key_url]));
        if !key.success() {
            return Ok(Remediation::Failure(format!(
                "failed to download {} signing key ({})",
                self.name,
                key.failure_summary()
            )));
        }

        let Some(codename) = codename(host) else {
            return Ok(Remediation::Failure(
                "cannot determine the release codename for the apt source".to_string(),
            ));
        };

        fs::create_dir_all(host.path(KEYRING_DIR))?;
        fs::write(host.path(self.keyring_path()), key.stdout.as_bytes())?;

        let list = host.path(self.source_list_path());
        if let Some(parent) = list.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&list, self.source_line(&codename))?;
        debug!("Wrote {}", list.display());

        let refreshed = update(host);
        if !refreshed.success() {
            return Ok(Remediation::Failure(format!(
                "apt-get update failed after adding {} ({})",
                self.name,
                refreshed.failure_summary()
            )));
        }

        Ok(Remediation::done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::MockRunner;
    use tempfile::TempDir;

    const PGDG: AptRepository = AptRepository {
        name: "postgresql",
        key_url: "https://www.postgresql.org/media/keys/ACCC4CF8.asc",
        url: "https://apt.postgresql.org/pub/repos/apt",
        suite_suffix: "-pgdg",
    };

    #[test]
    fn installed_requires_dpkg_status() {
        let runner = MockRunner::new();
        runner.respond(
            "dpkg-query -W -f=${Status} git",
            CommandResult::ok("install ok installed"),
        );
        runner.respond(
            "dpkg-query -W -f=${Status} curl",
            CommandResult::ok("deinstall ok config-files"),
        );
        let host = Host::new(&runner);

        assert!(is_installed(&host, "git"));
        assert!(!is_installed(&host, "curl"));
        assert!(!is_installed(&host, "gnupg"));
    }

    #[test]
    fn missing_preserves_order() {
        let runner = MockRunner::new();
        runner.respond(
            "dpkg-query -W -f=${Status} b",
            CommandResult::ok("install ok installed"),
        );
        let host = Host::new(&runner);

        assert_eq!(missing(&host, &["a", "b", "c"]), vec!["a", "c"]);
    }

    #[test]
    fn install_is_non_interactive() {
        let runner = MockRunner::new();
        runner.set_fallback(CommandResult::ok(""));
        let host = Host::new(&runner);

        assert!(install_or_fail(&host, &["nginx"]).is_success());
        let call = &runner.calls()[0];
        assert_eq!(call.command_line(), "apt-get install -y nginx");
        assert_eq!(
            call.env.get("DEBIAN_FRONTEND").map(String::as_str),
            Some("noninteractive")
        );
    }

    #[test]
    fn install_failure_names_packages() {
        let runner = MockRunner::new();
        runner.respond_prefix("apt-get install", CommandResult::exit(100, "E: broken"));
        let host = Host::new(&runner);

        let result = install_or_fail(&host, &["postgresql-17", "postgresql-contrib-17"]);
        assert!(
            matches!(result, Remediation::Failure(ref r) if r.contains("postgresql-17 postgresql-contrib-17"))
        );
    }

    #[test]
    fn codename_falls_back_to_os_release() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("etc")).unwrap();
        fs::write(
            temp.path().join("etc/os-release"),
            "ID=ubuntu\nVERSION_CODENAME=jammy\n",
        )
        .unwrap();
        let runner = MockRunner::new();
        let host = Host::with_root(&runner, temp.path());

        assert_eq!(codename(&host).as_deref(), Some("jammy"));
    }

    #[test]
    fn source_line_uses_keyring_and_suite() {
        assert_eq!(
            PGDG.source_line("noble"),
            "deb [signed-by=/etc/apt/keyrings/postgresql.asc] \
             https://apt.postgresql.org/pub/repos/apt noble-pgdg main\n"
        );
    }

    #[test]
    fn add_writes_key_and_source_list() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.respond_prefix("curl -fsSL", CommandResult::ok("-----BEGIN PGP-----"));
        runner.respond("lsb_release -cs", CommandResult::ok("noble\n"));
        runner.respond("apt-get update", CommandResult::ok(""));
        let host = Host::with_root(&runner, temp.path());

        assert!(PGDG.add(&host).unwrap().is_success());

        let key = fs::read_to_string(temp.path().join("etc/apt/keyrings/postgresql.asc")).unwrap();
        assert!(key.contains("BEGIN PGP"));
        let list =
            fs::read_to_string(temp.path().join("etc/apt/sources.list.d/postgresql.list")).unwrap();
        assert!(list.contains("noble-pgdg main"));
    }

    #[test]
    fn add_fails_when_key_download_fails() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.respond_prefix("curl", CommandResult::exit(6, "Could not resolve host"));
        let host = Host::with_root(&runner, temp.path());

        let result = PGDG.add(&host).unwrap();
        assert!(!result.is_success());
        assert!(!temp.path().join("etc/apt/keyrings").exists());
    }
}
