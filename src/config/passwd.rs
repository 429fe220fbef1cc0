//! Passwd database lookups.
//!
//! Reads `/etc/passwd` directly instead of calling `getpwnam`, so lookups
//! work against any host root.

use std::path::{Path, PathBuf};

/// One line of `/etc/passwd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    pub shell: String,
}

impl PasswdEntry {
    /// Parse a `name:x:uid:gid:gecos:home:shell` line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 7 {
            return None;
        }

        Some(Self {
            name: fields[0].to_string(),
            uid: fields[2].parse().ok()?,
            gid: fields[3].parse().ok()?,
            home: PathBuf::from(fields[5]),
            shell: fields[6].to_string(),
        })
    }
}

/// Find `name` in passwd-formatted content.
pub fn find_user(content: &str, name: &str) -> Option<PasswdEntry> {
    content
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .filter_map(PasswdEntry::parse_line)
        .find(|e| e.name == name)
}

/// Look up `name` in the passwd file at `path`.
///
/// A missing or unreadable file is treated as "no such user".
pub fn lookup_user(path: &Path, name: &str) -> Option<PasswdEntry> {
    let content = std::fs::read_to_string(path).ok()?;
    find_user(&content, name)
}
