//! Email set validation against the registered-user directory

use std::collections::BTreeSet;

use crate::services::directory::EmailDirectory;
use crate::utils::error::{EmailIssue, EmailIssues};
use crate::utils::validation::validate_email;

/// Split of a candidate set into accepted and rejected addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailPartition {
    pub valid: BTreeSet<String>,
    pub invalid: BTreeSet<String>,
    pub issues: EmailIssues,
}

impl EmailPartition {
    /// True when nothing blocks submission
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Checks candidates for syntax and registration; performs no I/O
pub struct EmailValidator<'a> {
    directory: &'a EmailDirectory,
}

impl<'a> EmailValidator<'a> {
    pub fn new(directory: &'a EmailDirectory) -> Self {
        Self { directory }
    }

    /// Partition `candidates`; duplicates collapse, empty input gives empty sets
    pub fn validate<I, S>(&self, candidates: I) -> EmailPartition
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut partition = EmailPartition::default();
        for candidate in candidates {
            let email = candidate.as_ref();
            if !validate_email(email) {
                partition.issues.record(EmailIssue::Format, email);
                partition.invalid.insert(email.to_string());
            } else if !self.directory.contains(email) {
                partition.issues.record(EmailIssue::Unknown, email);
                partition.invalid.insert(email.to_string());
            } else {
                partition.valid.insert(email.to_string());
            }
        }
        partition
    }
}
