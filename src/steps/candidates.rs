//! Capabilities satisfied by any one of several packages.

use super::step::{Probe, Remediation};

/// An ordered list of interchangeable packages providing one capability.
///
/// Probing accepts the first candidate already present. Remediation tries to
/// install each candidate in the same order and accepts the first that
/// succeeds.
///
/// # Example
///
/// ```
/// use netops_setup::steps::{CandidateSet, Remediation};
///
/// let audio = CandidateSet::new("audio library", ["libasound2t64", "libasound2"]);
///
/// // Only the older name installs on this release.
/// let result = audio.remediate(|_| false, |pkg| pkg == "libasound2");
/// assert_eq!(result, Remediation::Success("libasound2".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    capability: String,
    candidates: Vec<String>,
}

impl CandidateSet {
    pub fn new<I, S>(capability: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capability: capability.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// First candidate for which `is_present` holds.
    pub fn find_present(&self, mut is_present: impl FnMut(&str) -> bool) -> Option<&str> {
        self.candidates
            .iter()
            .map(String::as_str)
            .find(|c| is_present(c))
    }

    pub fn probe(&self, is_present: impl FnMut(&str) -> bool) -> Probe {
        match self.find_present(is_present) {
            Some(found) => Probe::Satisfied(format!("{} ({})", self.capability, found)),
            None => Probe::Unsatisfied(format!(
                "no {} installed (tried {})",
                self.capability,
                self.candidates.join(", ")
            )),
        }
    }

    /// Install the first candidate that installs successfully.
    ///
    /// Presence is re-checked first so a candidate that appeared since the
    /// probe is not reinstalled.
    pub fn remediate(
        &self,
        is_present: impl FnMut(&str) -> bool,
        mut install: impl FnMut(&str) -> bool,
    ) -> Remediation {
        if let Some(found) = self.find_present(is_present) {
            return Remediation::Success(found.to_string());
        }

        for candidate in &self.candidates {
            if install(candidate) {
                return Remediation::Success(candidate.clone());
            }
        }

        Remediation::Failure(format!(
            "could not install any {} candidate ({})",
            self.capability,
            self.candidates.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio() -> CandidateSet {
        CandidateSet::new("audio library", ["libasound2t64", "libasound2"])
    }

    #[test]
    fn probe_accepts_any_present_candidate() {
        let probe = audio().probe(|p| p == "libasound2");
        assert!(matches!(probe, Probe::Satisfied(ref d) if d.contains("libasound2")));
    }

    #[test]
    fn probe_checks_in_priority_order() {
        let mut checked = Vec::new();
        audio().probe(|p| {
            checked.push(p.to_string());
            true
        });
        assert_eq!(checked, vec!["libasound2t64"]);
    }

    #[test]
    fn probe_with_none_present_is_unsatisfied() {
        assert!(matches!(audio().probe(|_| false), Probe::Unsatisfied(_)));
    }

    #[test]
    fn remediate_installs_first_that_succeeds() {
        let mut attempts = Vec::new();
        let result = audio().remediate(
            |_| false,
            |p| {
                attempts.push(p.to_string());
                p == "libasound2"
            },
        );

        assert_eq!(result, Remediation::Success("libasound2".into()));
        assert_eq!(attempts, vec!["libasound2t64", "libasound2"]);
    }

    #[test]
    fn remediate_stops_at_first_success() {
        let mut attempts = 0;
        let result = audio().remediate(
            |_| false,
            |_| {
                attempts += 1;
                true
            },
        );

        assert_eq!(result, Remediation::Success("libasound2t64".into()));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn remediate_fails_when_nothing_installs() {
        let result = audio().remediate(|_| false, |_| false);
        assert!(matches!(result, Remediation::Failure(ref r) if r.contains("audio library")));
    }

    #[test]
    fn remediate_skips_install_when_present() {
        let result = audio().remediate(|p| p == "libasound2t64", |_| panic!("should not install"));
        assert!(result.is_success());
    }
}
