//! Check selection
//!
//! Decides per check whether it runs. Names match either a check's module or
//! its identifier. A non-empty exclusive set takes precedence over the skip
//! set: only exclusive checks run and everything else is skipped.

use std::collections::BTreeSet;

use gsm_qa_checks::CheckDescriptor;

/// Why a check was not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not in the exclusive set
    Excluded,
    /// Module is in the skip set
    SkippedByModule,
    /// Identifier is in the skip set
    SkippedIndividually,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excluded => write!(f, "Excluded."),
            Self::SkippedByModule => write!(f, "Skipped by module."),
            Self::SkippedIndividually => write!(f, "Skipped individually."),
        }
    }
}

/// Exclusive and skip sets of module or check names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    exclusive: BTreeSet<String>,
    skip: BTreeSet<String>,
}

impl Selection {
    /// Run everything
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from exclusive and skip names
    #[must_use]
    pub fn new<E, S>(exclusive: E, skip: S) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            exclusive: exclusive.into_iter().map(Into::into).collect(),
            skip: skip.into_iter().map(Into::into).collect(),
        }
    }

    /// `None` if the check runs, otherwise why it is skipped
    #[must_use]
    pub fn decide(&self, descriptor: &CheckDescriptor) -> Option<SkipReason> {
        if self.exclusive.contains(&descriptor.module) || self.exclusive.contains(&descriptor.id) {
            None
        } else if !self.exclusive.is_empty() {
            Some(SkipReason::Excluded)
        } else if self.skip.contains(&descriptor.module) {
            Some(SkipReason::SkippedByModule)
        } else if self.skip.contains(&descriptor.id) {
            Some(SkipReason::SkippedIndividually)
        } else {
            None
        }
    }

    /// Whether the check runs
    #[must_use]
    pub fn runs(&self, descriptor: &CheckDescriptor) -> bool {
        self.decide(descriptor).is_none()
    }
}
