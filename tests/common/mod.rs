use p4tape::p4::command::Command;
use p4tape::p4::engine::{ChapterVisit, CommandOutcome};
use p4tape::p4::exchange::{HttpRequest, HttpResponse};
use p4tape::p4::variables::VariableStore;

/// One chapter visit's worth of state, owned so tests can inspect it afterwards.
pub struct Exchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
    pub store: VariableStore,
    pub uses: i64,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            request: HttpRequest::default(),
            response: HttpResponse::default(),
            store: VariableStore::new(),
            uses: 1,
        }
    }

    pub fn with_request_body(mut self, body: &str) -> Self {
        self.request.body = body.to_string();
        self
    }

    pub fn with_response_body(mut self, body: &str) -> Self {
        self.response.body = body.to_string();
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response.headers.append(name, value);
        self
    }

    /// Compile and execute `lines` one after another without clearing Local.
    pub fn execute(&mut self, lines: &[&str]) -> Vec<CommandOutcome> {
        let commands: Vec<Command> = lines
            .iter()
            .map(|line| {
                Command::compile(line).unwrap_or_else(|e| panic!("'{line}' rejected: {e}"))
            })
            .collect();
        let mut visit = ChapterVisit::new(
            &self.request,
            &mut self.response,
            &mut self.store,
            &mut self.uses,
        );
        commands.iter().map(|c| visit.execute(c)).collect()
    }
}
