//! In-process model of the remote key swap
//!
//! [`AuthorizedKeys`] applies the same insert-then-remove mutation the
//! remote script performs, over file content held in memory. Mutation
//! compares lines whole and byte for byte; login matches on the key blob
//! only, as sshd does.

use super::report::MutationReport;

/// One step of a key swap, reported to an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStep {
    /// New key line is present (freshly appended or already there)
    NewKeyPresent,
    /// Old key lines were filtered out
    OldKeyRemoved,
}

/// Render a report in the format the remote script prints
pub fn script_output(report: &MutationReport) -> String {
    format!(
        "new-key: {}\nold-key: {}\n",
        if report.new_key_added { "added" } else { "present" },
        if report.old_key_removed { "removed" } else { "absent" },
    )
}

/// Content of an `authorized_keys` file as a list of lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedKeys {
    lines: Vec<String>,
}

impl AuthorizedKeys {
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Render with one trailing newline, or empty
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lines.iter().any(|l| l == key)
    }

    /// Number of lines exactly equal to `key`
    pub fn count(&self, key: &str) -> usize {
        self.lines.iter().filter(|l| *l == key).count()
    }

    /// Whether a login with `key` would be accepted
    ///
    /// Any line carrying the same algorithm and blob matches, whatever its
    /// options prefix or comment.
    pub fn authorizes(&self, key: &str) -> bool {
        let wanted: Vec<&str> = key.split_whitespace().take(2).collect();
        if wanted.len() < 2 {
            return false;
        }
        self.lines.iter().any(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            fields.windows(2).any(|pair| pair == wanted.as_slice())
        })
    }

    /// Append `key` unless an identical line exists; true if appended
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.lines.push(key.to_string());
        true
    }

    /// Drop every line equal to `key`; returns how many were dropped
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l != key);
        before - self.lines.len()
    }

    /// Insert the new key, then remove the old one
    pub fn rotate(&mut self, new_key: &str, old_key: &str) -> Result<MutationReport, String> {
        self.rotate_observed(new_key, old_key, |_, _| {})
    }

    /// Like [`rotate`](Self::rotate), calling `observe` after each step
    ///
    /// The old key is only removed once the new key line is present, and the
    /// removal is refused if it would take the new key with it.
    pub fn rotate_observed(
        &mut self,
        new_key: &str,
        old_key: &str,
        mut observe: impl FnMut(MutationStep, &AuthorizedKeys),
    ) -> Result<MutationReport, String> {
        let new_key = new_key.trim();
        let old_key = old_key.trim();
        if new_key.is_empty() || old_key.is_empty() {
            return Err("empty key line".to_string());
        }
        if new_key == old_key {
            return Err("new key is identical to old key".to_string());
        }

        let new_key_added = self.insert(new_key);
        if !self.contains(new_key) {
            return Err("new key missing after insert".to_string());
        }
        observe(MutationStep::NewKeyPresent, self);

        let old_key_removed = self.remove(old_key) > 0;
        if old_key_removed {
            observe(MutationStep::OldKeyRemoved, self);
        }

        Ok(MutationReport {
            new_key_added,
            old_key_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW: &str = "ssh-ed25519 AAAANEW admin@dbserver";
    const OLD: &str = "ssh-ed25519 AAAAOLD old@laptop";

    #[test]
    fn test_rotate_swaps_keys() {
        let mut keys = AuthorizedKeys::parse(&format!("ssh-rsa AAAAX other@host\n{OLD}\n"));
        let report = keys.rotate(NEW, OLD).unwrap();

        assert!(report.new_key_added);
        assert!(report.old_key_removed);
        assert_eq!(keys.render(), format!("ssh-rsa AAAAX other@host\n{NEW}\n"));
    }

    #[test]
    fn test_rotate_twice_is_idempotent() {
        let mut keys = AuthorizedKeys::parse(&format!("{OLD}\n{OLD}\n"));
        keys.rotate(NEW, OLD).unwrap();
        let after_first = keys.clone();

        let report = keys.rotate(NEW, OLD).unwrap();
        assert!(!report.new_key_added);
        assert!(!report.old_key_removed);
        assert_eq!(keys, after_first);
        assert_eq!(keys.count(NEW), 1);
        assert_eq!(keys.count(OLD), 0);
    }

    #[test]
    fn test_new_key_present_before_old_key_removed() {
        let mut keys = AuthorizedKeys::parse(&format!("{OLD}\n"));
        let mut steps = Vec::new();

        keys.rotate_observed(NEW, OLD, |step, state| {
            steps.push(step);
            assert!(state.contains(NEW), "new key must be present at {step:?}");
            if step == MutationStep::NewKeyPresent {
                assert!(state.contains(OLD), "old key must survive until the new key is in");
            }
        })
        .unwrap();

        assert_eq!(
            steps,
            vec![MutationStep::NewKeyPresent, MutationStep::OldKeyRemoved]
        );
    }

    #[test]
    fn test_rotate_refuses_identical_keys() {
        let mut keys = AuthorizedKeys::parse(&format!("{OLD}\n"));
        assert!(keys.rotate(OLD, OLD).is_err());
        assert_eq!(keys.count(OLD), 1);
    }

    #[test]
    fn test_exact_match_only() {
        let mut keys = AuthorizedKeys::parse(&format!("{OLD} extra\nfrom=\"10.0.0.1\" {OLD}\n"));
        let report = keys.rotate(NEW, OLD).unwrap();
        // Neither line is byte-identical to the old key
        assert_eq!(keys.lines().len(), 3);
        assert!(report.old_key_retained());
        assert!(keys.authorizes(OLD));
    }

    #[test]
    fn test_authorizes_ignores_options_and_comment() {
        let keys = AuthorizedKeys::parse("from=\"10.0.0.1\" ssh-ed25519 AAAAOLD laptop-2019\n");
        assert!(keys.authorizes(OLD));
        assert!(!keys.authorizes(NEW));
        assert!(!keys.authorizes("ssh-ed25519"));
    }

    #[test]
    fn test_script_output_parses_back() {
        let report = MutationReport {
            new_key_added: true,
            old_key_removed: false,
        };
        assert_eq!(MutationReport::parse(&script_output(&report)), Some(report));
    }
}
