use std::collections::BTreeMap;

use serde::Serialize;

use crate::fixture::{Fixture, ReplayOutcome};
use crate::p4::exchange::HttpResponse;
use crate::p4::variables::Scope;

use super::{Endpoint, Verdict};

/// JSON written to stdout by `p4tape replay`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReplayOutput {
    pub chapter: String,
    pub uses: i64,
    pub response: HttpResponse,
    pub chapter_uses: BTreeMap<String, i64>,
    pub scopes: ScopesOutput,
    pub rejected: Vec<RejectedOutput>,
}

/// Variables that outlive the visit. Local is always empty after a replay.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScopesOutput {
    pub chapter: BTreeMap<String, String>,
    pub test_bounds: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RejectedOutput {
    pub sequence: usize,
    pub line_index: usize,
    pub line: String,
    pub error: String,
}

fn build_replay_output(chapter: &str, outcome: ReplayOutcome) -> ReplayOutput {
    let rejected = outcome
        .report
        .rejected
        .iter()
        .map(|r| RejectedOutput {
            sequence: r.sequence,
            line_index: r.error.index,
            line: r.error.line.clone(),
            error: r.error.source.to_string(),
        })
        .collect();

    ReplayOutput {
        chapter: chapter.to_string(),
        uses: outcome.uses,
        scopes: ScopesOutput {
            chapter: outcome.store.scope(Scope::Chapter).clone(),
            test_bounds: outcome.store.scope(Scope::TestBounds).clone(),
        },
        chapter_uses: outcome.store.test_bounds().chapter_uses.clone(),
        response: outcome.response,
        rejected,
    }
}

/// Replays one fixture and reports the resulting state.
pub struct ReplayAdapter {
    fixture: Fixture,
}

impl ReplayAdapter {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }
}

impl Endpoint for ReplayAdapter {
    fn evaluate(&self) -> Result<Verdict, anyhow::Error> {
        let outcome = self.fixture.replay();
        tracing::info!(
            chapter = self.fixture.chapter_name(),
            uses = outcome.uses,
            executed = outcome.report.executed.len(),
            rejected = outcome.report.rejected.len(),
            "replayed chapter"
        );
        Ok(Verdict::Replay(Box::new(build_replay_output(
            self.fixture.chapter_name(),
            outcome,
        ))))
    }

    fn handle_verdict(&self, verdict: Verdict) -> Result<i32, anyhow::Error> {
        let json = serde_json::to_string_pretty(&verdict)?;
        println!("{json}");
        Ok(verdict.exit_code())
    }
}
