use super::SequenceError;
use super::command::Command;
use super::engine::{ChapterVisit, CommandOutcome};
use super::exchange::{HttpRequest, HttpResponse};
use super::variables::VariableStore;

/// A sequence whose every line parsed and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSequence {
    commands: Vec<Command>,
}

impl CompiledSequence {
    /// Compile every line; the first invalid line rejects the whole sequence.
    pub fn compile<S: AsRef<str>>(lines: &[S]) -> Result<Self, SequenceError> {
        let commands = lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let line = line.as_ref();
                Command::compile(line).map_err(|source| SequenceError {
                    index,
                    line: line.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Render back to persisted text.
    pub fn to_lines(&self) -> Vec<String> {
        self.commands.iter().map(ToString::to_string).collect()
    }
}

/// A sequence that failed validation and was left out of the replay.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSequence {
    pub sequence: usize,
    pub error: SequenceError,
}

#[derive(Debug, Default, PartialEq)]
pub struct ReplayReport {
    /// Outcomes per executed sequence, as `(sequence index, outcomes)`.
    pub executed: Vec<(usize, Vec<CommandOutcome>)>,
    pub rejected: Vec<RejectedSequence>,
}

/// One recorded chapter: its name, use counter and attached sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chapter {
    pub name: String,
    pub uses: i64,
    pub sequences: Vec<Vec<String>>,
}

impl Chapter {
    /// Compile every sequence, keeping the valid ones in declaration order.
    pub fn compile(&self) -> (Vec<(usize, CompiledSequence)>, Vec<RejectedSequence>) {
        let mut compiled = Vec::new();
        let mut rejected = Vec::new();
        for (sequence, lines) in self.sequences.iter().enumerate() {
            match CompiledSequence::compile(lines) {
                Ok(c) => compiled.push((sequence, c)),
                Err(error) => {
                    tracing::warn!(chapter = %self.name, sequence, %error, "sequence rejected");
                    rejected.push(RejectedSequence { sequence, error });
                }
            }
        }
        (compiled, rejected)
    }

    /// Serve this chapter once: count the use, then run every valid sequence
    /// against the exchange. Invalid sequences are skipped and reported.
    pub fn replay(
        &mut self,
        request: &HttpRequest,
        response: &mut HttpResponse,
        store: &mut VariableStore,
    ) -> ReplayReport {
        self.uses += 1;
        store.set_chapter_uses(self.name.as_str(), self.uses);

        let (compiled, rejected) = self.compile();
        let mut visit = ChapterVisit::new(request, response, store, &mut self.uses);
        let executed = compiled
            .into_iter()
            .map(|(index, sequence)| {
                tracing::debug!(sequence = index, "running sequence");
                (index, visit.run(sequence.commands()))
            })
            .collect();

        // Keep `use[name]` in step with self-writes made during the visit.
        let uses = *visit.uses;
        store.set_chapter_uses(self.name.as_str(), uses);

        ReplayReport { executed, rejected }
    }
}
