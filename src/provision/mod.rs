//! The concrete step catalogue for a NetOps application server.
//!
//! Step bodies are thin: each probes with read-only commands or file checks
//! and remediates with the smallest mutating action. Ordering lives in
//! [`default_steps`].

pub mod accounts;
pub mod apt;
pub mod node;
pub mod packages;
pub mod postgres;

pub use accounts::{DeployUser, DirectoryStructure};
pub use node::{NodeJs, Pm2, ProjectDependencies};
pub use packages::{Certbot, Nginx, PythonPackages, SystemPackages};
pub use postgres::{PostgreSql, PostgresDatabases, TimescaleDb, TimescaleTune};

use crate::steps::Step;

/// The fixed, ordered step list. Each step may assume every earlier step
/// succeeded.
pub fn default_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(SystemPackages::new()),
        Box::new(NodeJs),
        Box::new(Pm2),
        Box::new(PostgreSql),
        Box::new(TimescaleDb),
        Box::new(TimescaleTune),
        Box::new(PostgresDatabases),
        Box::new(PythonPackages),
        Box::new(Nginx),
        Box::new(Certbot),
        Box::new(DeployUser),
        Box::new(DirectoryStructure),
        Box::new(ProjectDependencies),
    ]
}

/// Names of [`default_steps`], in order.
pub fn step_names() -> Vec<String> {
    default_steps()
        .iter()
        .map(|s| s.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::Fatality;
    use std::collections::HashSet;

    #[test]
    fn catalogue_order_is_fixed() {
        assert_eq!(
            step_names(),
            vec![
                "system_packages",
                "nodejs",
                "pm2",
                "postgresql",
                "timescaledb",
                "timescaledb_tune",
                "postgresql_databases",
                "python_packages",
                "nginx",
                "certbot",
                "deploy_user",
                "directory_structure",
                "project_dependencies",
            ]
        );
    }

    #[test]
    fn names_are_unique() {
        let names = step_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn only_tuning_and_project_steps_are_non_fatal() {
        let warn: Vec<String> = default_steps()
            .iter()
            .filter(|s| s.fatality() == Fatality::Warn)
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(warn, vec!["timescaledb_tune", "project_dependencies"]);
    }
}
