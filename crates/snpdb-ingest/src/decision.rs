// SPDX-License-Identifier: Apache-2.0

//! Shared conflict-resolution capability for marker dedup and individual association.

use std::fmt::{Display, Formatter};

use tracing::{info, warn};

use crate::ImportError;

/// Answer to a [`ConflictPrompt`]. `UseExisting` indexes `candidates` from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    CreateNew,
    UseExisting(usize),
    AlwaysCreateNew,
    AlwaysUseExisting,
    Abort,
}

/// Which non-indexed answers a prompt accepts. `UseExisting(i)` for any valid
/// candidate index and `Abort` are always accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecisionOptions {
    pub create_new: bool,
    pub always_create_new: bool,
    pub always_use_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Marker,
    Individual,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Individual => "individual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictPrompt {
    pub kind: ConflictKind,
    pub subject: String,
    pub candidates: Vec<String>,
    pub options: DecisionOptions,
}

impl ConflictPrompt {
    #[must_use]
    pub fn allows(&self, decision: Decision) -> bool {
        match decision {
            Decision::CreateNew => self.options.create_new,
            Decision::UseExisting(idx) => idx < self.candidates.len(),
            Decision::AlwaysCreateNew => self.options.always_create_new,
            Decision::AlwaysUseExisting => self.options.always_use_existing,
            Decision::Abort => true,
        }
    }
}

impl Display for ConflictPrompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} {} matches existing records:",
            self.kind.as_str(),
            self.subject
        )?;
        for (idx, candidate) in self.candidates.iter().enumerate() {
            writeln!(f, "({}) {candidate}", idx + 1)?;
        }
        Ok(())
    }
}

pub trait DecisionHandler {
    fn decide(&mut self, prompt: &ConflictPrompt) -> Decision;
}

impl<F: FnMut(&ConflictPrompt) -> Decision> DecisionHandler for F {
    fn decide(&mut self, prompt: &ConflictPrompt) -> Decision {
        self(prompt)
    }
}

/// How conflicts are settled when they arise.
pub enum ResolutionStrategy<'h> {
    /// Create a new record whenever that is offered, else reuse the first candidate.
    AutoCreate,
    /// Reuse the first candidate.
    AutoReuse,
    /// Refuse to decide; the import fails.
    FailFast,
    Prompt(&'h mut dyn DecisionHandler),
}

impl ResolutionStrategy<'_> {
    /// Settles one conflict and checks the answer against the options offered.
    pub fn resolve(&mut self, prompt: &ConflictPrompt) -> Result<Decision, ImportError> {
        let decision = match self {
            Self::AutoCreate if prompt.options.create_new => Decision::CreateNew,
            Self::AutoCreate => {
                warn!(
                    kind = prompt.kind.as_str(),
                    subject = %prompt.subject,
                    "create-new not offered; reusing first candidate"
                );
                Decision::UseExisting(0)
            }
            Self::AutoReuse => {
                if prompt.candidates.len() > 1 {
                    warn!(
                        kind = prompt.kind.as_str(),
                        subject = %prompt.subject,
                        candidates = prompt.candidates.len(),
                        "ambiguous match; reusing first candidate"
                    );
                }
                Decision::UseExisting(0)
            }
            Self::FailFast => {
                return Err(ImportError::DecisionRequired(format!(
                    "{} {} has {} candidate(s) and conflicts are not resolved automatically",
                    prompt.kind.as_str(),
                    prompt.subject,
                    prompt.candidates.len()
                )))
            }
            Self::Prompt(handler) => handler.decide(prompt),
        };
        if !prompt.allows(decision) {
            return Err(ImportError::InvalidDecision(format!(
                "{decision:?} is not an offered option for {} {}",
                prompt.kind.as_str(),
                prompt.subject
            )));
        }
        info!(
            kind = prompt.kind.as_str(),
            subject = %prompt.subject,
            ?decision,
            "conflict resolved"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(candidates: usize, options: DecisionOptions) -> ConflictPrompt {
        ConflictPrompt {
            kind: ConflictKind::Marker,
            subject: "rs1".to_string(),
            candidates: (0..candidates).map(|i| format!("c{i}")).collect(),
            options,
        }
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut handler = |_: &ConflictPrompt| Decision::UseExisting(2);
        let mut strategy = ResolutionStrategy::Prompt(&mut handler);
        let err = strategy
            .resolve(&prompt(2, DecisionOptions::default()))
            .expect_err("index 2 of 2");
        assert!(matches!(err, ImportError::InvalidDecision(_)));
    }

    #[test]
    fn auto_create_falls_back_to_first_candidate() {
        let decision = ResolutionStrategy::AutoCreate
            .resolve(&prompt(2, DecisionOptions::default()))
            .expect("decision");
        assert_eq!(decision, Decision::UseExisting(0));
    }

    #[test]
    fn fail_fast_never_decides() {
        let err = ResolutionStrategy::FailFast
            .resolve(&prompt(1, DecisionOptions::default()))
            .expect_err("fail fast");
        assert!(matches!(err, ImportError::DecisionRequired(_)));
    }

    #[test]
    fn abort_is_always_allowed() {
        assert!(prompt(0, DecisionOptions::default()).allows(Decision::Abort));
    }
}
