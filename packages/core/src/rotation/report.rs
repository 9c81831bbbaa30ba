//! Status lines printed by the remote key swap

/// What a key swap changed, as printed by the remote script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationReport {
    pub new_key_added: bool,
    pub old_key_removed: bool,
}

impl MutationReport {
    /// Parse the `new-key: ...` / `old-key: ...` lines of a session's stdout
    pub fn parse(stdout: &str) -> Option<Self> {
        let mut new_key_added = None;
        let mut old_key_removed = None;

        for line in stdout.lines() {
            match line.trim() {
                "new-key: added" => new_key_added = Some(true),
                "new-key: present" => new_key_added = Some(false),
                "old-key: removed" => old_key_removed = Some(true),
                "old-key: absent" => old_key_removed = Some(false),
                _ => {}
            }
        }

        Some(Self {
            new_key_added: new_key_added?,
            old_key_removed: old_key_removed?,
        })
    }

    /// The old key is still accepted by the host
    ///
    /// The swap session itself logged in with the old key. If no line equal
    /// to it was found, sshd matched the key through some other entry, such
    /// as one with options or a different comment, and that entry survives.
    pub fn old_key_retained(&self) -> bool {
        !self.old_key_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_report() {
        let report = MutationReport::parse("new-key: added\nold-key: removed\n").unwrap();
        assert!(report.new_key_added);
        assert!(report.old_key_removed);
        assert!(!report.old_key_retained());
    }

    #[test]
    fn test_parse_ignores_other_output() {
        let stdout = "Welcome to db01\n  new-key: present\nold-key: absent\n";
        let report = MutationReport::parse(stdout).unwrap();
        assert!(!report.new_key_added);
        assert!(report.old_key_retained());
    }

    #[test]
    fn test_parse_incomplete_report() {
        assert!(MutationReport::parse("new-key: added\n").is_none());
        assert!(MutationReport::parse("").is_none());
    }
}
