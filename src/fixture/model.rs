use std::collections::BTreeMap;

use serde::Deserialize;

use crate::p4::exchange::{HttpRequest, HttpResponse};
use crate::p4::sequence::{Chapter, CompiledSequence, ReplayReport};
use crate::p4::variables::{Scope, TestBounds, VariableStore};

/// One chapter visit described in YAML: the recorded exchange, the state the
/// visit starts from, and the sequences attached to the chapter.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Fixture {
    pub chapter: Option<String>,
    #[serde(default)]
    pub uses: i64,
    #[serde(default)]
    pub request: HttpRequest,
    #[serde(default)]
    pub response: HttpResponse,
    #[serde(default)]
    pub chapter_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub test_bounds: BTreeMap<String, String>,
    #[serde(default)]
    pub chapter_uses: BTreeMap<String, i64>,
    #[serde(default)]
    pub sequences: Vec<Vec<String>>,
}

/// State after replaying a fixture.
#[derive(Debug)]
pub struct ReplayOutcome {
    pub response: HttpResponse,
    pub store: VariableStore,
    pub uses: i64,
    pub report: ReplayReport,
}

const DEFAULT_CHAPTER: &str = "chapter";

impl Fixture {
    pub fn chapter_name(&self) -> &str {
        self.chapter.as_deref().unwrap_or(DEFAULT_CHAPTER)
    }

    /// Validate the fixture structure.
    ///
    /// Collects all problems at once. P4 lines are not checked here: a bad
    /// sequence only disables itself at replay time (see [`Fixture::lint`]).
    pub fn validate(&self) -> Result<(), crate::fixture::FixtureError> {
        let mut errors = Vec::new();

        if self.chapter.as_deref().is_some_and(|c| c.trim().is_empty()) {
            errors.push("chapter: must not be empty".to_string());
        }
        if self.uses < 0 {
            errors.push(format!("uses: must not be negative (got {})", self.uses));
        }
        for (name, uses) in &self.chapter_uses {
            if *uses < 0 {
                errors.push(format!(
                    "chapter_uses.{name}: must not be negative (got {uses})"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(crate::fixture::FixtureError::Validation(errors))
        }
    }

    /// Every sequence that would be rejected at replay, as display strings.
    pub fn lint(&self) -> Vec<String> {
        self.sequences
            .iter()
            .enumerate()
            .filter_map(|(i, lines)| {
                CompiledSequence::compile(lines)
                    .err()
                    .map(|e| format!("sequences[{i}]: {e}"))
            })
            .collect()
    }

    /// Build the variable store the visit starts from.
    pub fn store(&self) -> VariableStore {
        let mut store = VariableStore::with_test_bounds(TestBounds {
            vars: self.test_bounds.clone(),
            chapter_uses: self.chapter_uses.clone(),
        });
        for (name, value) in &self.chapter_vars {
            store.set(Scope::Chapter, name.as_str(), value.as_str());
        }
        store
    }

    pub fn replay(&self) -> ReplayOutcome {
        let mut chapter = Chapter {
            name: self.chapter_name().to_string(),
            uses: self.uses,
            sequences: self.sequences.clone(),
        };
        let mut response = self.response.clone();
        let mut store = self.store();

        let report = chapter.replay(&self.request, &mut response, &mut store);

        ReplayOutcome {
            response,
            store,
            uses: chapter.uses,
            report,
        }
    }
}

/// Parse a YAML string into a `Fixture`.
pub fn parse_fixture(yaml: &str) -> Result<Fixture, crate::fixture::FixtureError> {
    let fixture: Fixture = serde_saphyr::from_str(yaml)?;
    Ok(fixture)
}
