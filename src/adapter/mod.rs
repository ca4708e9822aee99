pub mod check_adapter;
pub mod replay_adapter;

use serde::Serialize;

use check_adapter::LineVerdict;
use replay_adapter::ReplayOutput;

/// What an endpoint concluded, ready to be written out.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Verdict {
    /// One entry per checked command line.
    Check(Vec<LineVerdict>),
    /// State after a fixture replay.
    Replay(Box<ReplayOutput>),
}

impl Verdict {
    /// False when any line was invalid or any sequence was rejected.
    pub fn accepted(&self) -> bool {
        match self {
            Verdict::Check(lines) => lines.iter().all(|l| l.valid),
            Verdict::Replay(output) => output.rejected.is_empty(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.accepted() { 0 } else { 1 }
    }
}

/// Abstracts input/output differences between the `check` and `replay`
/// endpoints.
pub trait Endpoint {
    /// Do the endpoint's work on its already-gathered input.
    fn evaluate(&self) -> Result<Verdict, anyhow::Error>;

    /// Write the verdict in the endpoint's format and return the exit code.
    fn handle_verdict(&self, verdict: Verdict) -> Result<i32, anyhow::Error>;

    /// Report an error. Returns the exit code.
    fn handle_error(&self, error: anyhow::Error) -> i32 {
        tracing::error!(%error, "p4tape failed");
        eprintln!("p4tape: {error}");
        2
    }
}

/// Run the common flow for any endpoint.
///
/// 1. Evaluate the endpoint's input
/// 2. Hand the verdict to the endpoint's writer
/// 3. Route every failure through `handle_error`
pub fn run(endpoint: &dyn Endpoint) -> i32 {
    let verdict = match endpoint.evaluate() {
        Ok(verdict) => verdict,
        Err(e) => return endpoint.handle_error(e),
    };
    endpoint
        .handle_verdict(verdict)
        .unwrap_or_else(|e| endpoint.handle_error(e))
}
