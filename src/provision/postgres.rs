//! PostgreSQL, TimescaleDB and the application databases.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::DeploymentMode;
use crate::error::Result;
use crate::shell::{CommandResult, CommandSpec, Host};
use crate::steps::{probe_major, ExecutionContext, Fatality, Probe, Remediation, Step, StepScope};

use super::apt::{self, AptRepository};

/// Required PostgreSQL major version.
pub const POSTGRES_MAJOR: u32 = 17;

/// Database role the application connects as.
pub const DEPLOY_ROLE: &str = "deploy";

const DEPLOY_ROLE_PASSWORD: &str = "deploy_password_change_me";

static PSQL_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PostgreSQL\)\s+(\d+)").unwrap());

const PGDG: AptRepository = AptRepository {
    name: "postgresql",
    key_url: "https://www.postgresql.org/media/keys/ACCC4CF8.asc",
    url: "https://apt.postgresql.org/pub/repos/apt",
    suite_suffix: "-pgdg",
};

const TIMESCALE: AptRepository = AptRepository {
    name: "timescaledb",
    key_url: "https://packagecloud.io/timescale/timescaledb/gpgkey",
    url: "https://packagecloud.io/timescale/timescaledb/ubuntu/",
    suite_suffix: "",
};

/// Databases for a deployment mode.
pub fn databases_for(mode: DeploymentMode) -> &'static [&'static str] {
    match mode {
        DeploymentMode::Production => &["suiftly_prod"],
        DeploymentMode::Development => &["suiftly_dev", "suiftly_test"],
    }
}

/// Run `psql` as the postgres superuser.
fn psql(host: &Host<'_>, database: Option<&str>, sql: &str) -> CommandResult {
    let mut spec = CommandSpec::new("psql").arg("-t");
    if let Some(db) = database {
        spec = spec.args(["-d", db]);
    }
    host.run(&spec.arg("-c").arg(sql).as_user("postgres"))
}

/// Run a query and report whether it returned any rows.
fn has_rows(host: &Host<'_>, database: Option<&str>, sql: &str) -> bool {
    let result = psql(host, database, sql);
    result.success() && !result.stdout.trim().is_empty()
}

fn restart_postgres(host: &Host<'_>) -> CommandResult {
    host.run(&CommandSpec::new("systemctl").args(["restart", "postgresql"]))
}

/// PostgreSQL 17 from the PGDG repository.
#[derive(Debug, Default)]
pub struct PostgreSql;

impl Step for PostgreSql {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn description(&self) -> &str {
        "Install PostgreSQL 17"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let result = host.run(&CommandSpec::new("psql").arg("--version"));
        Ok(probe_major("psql", &result, &PSQL_VERSION, POSTGRES_MAJOR))
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        if let failure @ Remediation::Failure(_) = PGDG.add(host)? {
            return Ok(failure);
        }
        Ok(apt::install_or_fail(
            host,
            &["postgresql-17", "postgresql-contrib-17"],
        ))
    }
}

/// TimescaleDB extension packages.
#[derive(Debug, Default)]
pub struct TimescaleDb;

impl Step for TimescaleDb {
    fn name(&self) -> &str {
        "timescaledb"
    }

    fn description(&self) -> &str {
        "Install TimescaleDB for PostgreSQL 17"
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        Ok(
            if has_rows(
                host,
                None,
                "SELECT name FROM pg_available_extensions WHERE name='timescaledb';",
            ) {
                Probe::Satisfied("timescaledb extension available".into())
            } else {
                Probe::Unsatisfied("timescaledb extension not available".into())
            },
        )
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        if let failure @ Remediation::Failure(_) = TIMESCALE.add(host)? {
            return Ok(failure);
        }
        if let failure @ Remediation::Failure(_) =
            apt::install_or_fail(host, &["timescaledb-2-postgresql-17"])
        {
            return Ok(failure);
        }

        let restarted = restart_postgres(host);
        Ok(if restarted.success() {
            Remediation::done()
        } else {
            Remediation::Failure(format!(
                "PostgreSQL restart failed ({})",
                restarted.failure_summary()
            ))
        })
    }
}

/// `timescaledb-tune` applied to the server configuration.
#[derive(Debug, Default)]
pub struct TimescaleTune;

impl Step for TimescaleTune {
    fn name(&self) -> &str {
        "timescaledb_tune"
    }

    fn description(&self) -> &str {
        "Tune PostgreSQL for TimescaleDB"
    }

    fn fatality(&self) -> Fatality {
        Fatality::Warn
    }

    fn probe(&self, host: &Host<'_>, _ctx: &ExecutionContext) -> Result<Probe> {
        let result = psql(host, None, "SHOW shared_preload_libraries;");
        Ok(if result.success() && result.stdout.contains("timescaledb") {
            Probe::Satisfied("timescaledb preloaded".into())
        } else {
            Probe::Unsatisfied("timescaledb not in shared_preload_libraries".into())
        })
    }

    fn remediate(&self, host: &Host<'_>, _ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let tuned = host.run(&CommandSpec::new("timescaledb-tune").args(["--quiet", "--yes"]));
        if !tuned.success() {
            return Ok(Remediation::Failure(format!(
                "timescaledb-tune failed ({}); PostgreSQL may need manual configuration",
                tuned.failure_summary()
            )));
        }

        let restarted = restart_postgres(host);
        Ok(if restarted.success() {
            Remediation::done()
        } else {
            Remediation::Failure(format!(
                "PostgreSQL restart failed after tuning ({})",
                restarted.failure_summary()
            ))
        })
    }
}

/// Application databases, the deploy role and the TimescaleDB extension.
///
/// Failing to enable the extension on a database is a warning, not a failure.
#[derive(Debug, Default)]
pub struct PostgresDatabases;

impl PostgresDatabases {
    fn existing_databases(host: &Host<'_>) -> Vec<String> {
        let result = host.run(&CommandSpec::new("psql").arg("-lqt").as_user("postgres"));
        if !result.success() {
            return Vec::new();
        }
        result
            .stdout
            .lines()
            .filter_map(|line| line.split('|').next())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn role_exists(host: &Host<'_>) -> bool {
        has_rows(
            host,
            None,
            &format!("SELECT 1 FROM pg_roles WHERE rolname='{}';", DEPLOY_ROLE),
        )
    }

    fn extension_enabled(host: &Host<'_>, database: &str) -> bool {
        has_rows(
            host,
            Some(database),
            "SELECT 1 FROM pg_extension WHERE extname='timescaledb';",
        )
    }
}

impl Step for PostgresDatabases {
    fn name(&self) -> &str {
        "postgresql_databases"
    }

    fn description(&self) -> &str {
        "Create databases and the deploy role"
    }

    fn probe(&self, host: &Host<'_>, ctx: &ExecutionContext) -> Result<Probe> {
        let wanted = databases_for(ctx.mode());
        let existing = Self::existing_databases(host);

        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|db| !existing.iter().any(|e| e == db))
            .collect();
        if !missing.is_empty() {
            return Ok(Probe::Unsatisfied(format!(
                "missing database(s) {}",
                missing.join(", ")
            )));
        }

        if !Self::role_exists(host) {
            return Ok(Probe::Unsatisfied(format!("role '{}' missing", DEPLOY_ROLE)));
        }

        if let Some(db) = wanted.iter().find(|db| !Self::extension_enabled(host, db)) {
            return Ok(Probe::Unsatisfied(format!("timescaledb not enabled on {}", db)));
        }

        Ok(Probe::Satisfied(wanted.join(", ")))
    }

    fn remediate(&self, host: &Host<'_>, ctx: &mut StepScope<'_>) -> Result<Remediation> {
        let wanted = databases_for(ctx.mode());
        debug!("{} mode: databases {}", ctx.mode(), wanted.join(", "));
        let existing = Self::existing_databases(host);

        for &db in wanted {
            if !existing.iter().any(|e| e == db) {
                let created = host.run(&CommandSpec::new("createdb").arg(db).as_user("postgres"));
                if !created.success() {
                    return Ok(Remediation::Failure(format!(
                        "failed to create database {} ({}); check sudo access for the postgres user",
                        db,
                        created.failure_summary()
                    )));
                }
            }

            let extension = psql(
                host,
                Some(db),
                "CREATE EXTENSION IF NOT EXISTS timescaledb CASCADE;",
            );
            if !extension.success() {
                ctx.add_warning(format!("TimescaleDB extension not enabled on {}", db));
            }
        }

        if !Self::role_exists(host) {
            let created = psql(
                host,
                None,
                &format!(
                    "CREATE USER {} WITH PASSWORD '{}';",
                    DEPLOY_ROLE, DEPLOY_ROLE_PASSWORD
                ),
            );
            if !created.success() {
                return Ok(Remediation::Failure(format!(
                    "failed to create role '{}' ({})",
                    DEPLOY_ROLE,
                    created.failure_summary()
                )));
            }
        }

        for &db in wanted {
            let granted = psql(
                host,
                None,
                &format!("GRANT ALL PRIVILEGES ON DATABASE {} TO {};", db, DEPLOY_ROLE),
            );
            if !granted.success() {
                ctx.add_warning(format!("Could not grant privileges on {} to {}", db, DEPLOY_ROLE));
            }
        }

        Ok(Remediation::Success(wanted.join(", ")))
    }
}
