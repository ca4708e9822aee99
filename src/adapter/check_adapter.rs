use serde::{Deserialize, Serialize};

use crate::fixture::Fixture;
use crate::p4::command::Command;

use super::{Endpoint, Verdict};

/// stdin JSON input for `p4tape check`.
#[derive(Debug, Deserialize)]
pub struct CheckInput {
    pub command: String,
}

/// Result of checking one command line.
#[derive(Debug, Serialize, PartialEq)]
pub struct LineVerdict {
    pub command: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The command rendered back from its parsed form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

/// Parse and validate one line.
pub fn check_line(line: &str) -> LineVerdict {
    match Command::compile(line) {
        Ok(command) => LineVerdict {
            command: line.to_string(),
            valid: true,
            error: None,
            canonical: Some(command.to_string()),
        },
        Err(e) => LineVerdict {
            command: line.to_string(),
            valid: false,
            error: Some(e.to_string()),
            canonical: None,
        },
    }
}

/// Validates P4 command lines without running them.
pub struct CheckAdapter {
    lines: Vec<String>,
}

impl CheckAdapter {
    /// Build from the `--command` CLI argument.
    pub fn from_command(command: String) -> Self {
        Self {
            lines: vec![command],
        }
    }

    /// Build from stdin JSON input.
    pub fn from_stdin(input: CheckInput) -> Self {
        Self::from_command(input.command)
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Every line of every sequence in the fixture, in order.
    pub fn from_fixture(fixture: &Fixture) -> Self {
        Self {
            lines: fixture.sequences.iter().flatten().cloned().collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Endpoint for CheckAdapter {
    fn evaluate(&self) -> Result<Verdict, anyhow::Error> {
        if self.lines.is_empty() {
            return Err(anyhow::anyhow!("no commands to check"));
        }
        let verdicts: Vec<LineVerdict> = self
            .lines
            .iter()
            .map(String::as_str)
            .map(check_line)
            .collect();
        for v in verdicts.iter().filter(|v| !v.valid) {
            tracing::info!(command = %v.command, error = ?v.error, "invalid command");
        }
        Ok(Verdict::Check(verdicts))
    }

    fn handle_verdict(&self, verdict: Verdict) -> Result<i32, anyhow::Error> {
        if let Verdict::Check(lines) = &verdict {
            for line in lines {
                println!("{}", serde_json::to_string(line)?);
            }
        }
        Ok(verdict.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rstest::rstest;

    #[rstest]
    fn from_command_holds_one_line() {
        let adapter = CheckAdapter::from_command("var[a]->b".to_string());
        assert_eq!(adapter.lines(), ["var[a]->b"]);
    }

    #[rstest]
    fn from_stdin_holds_the_command_field() {
        let input: CheckInput = serde_json::from_str(r#"{"command": "use->n"}"#).unwrap();
        let adapter = CheckAdapter::from_stdin(input);
        assert_eq!(adapter.lines(), ["use->n"]);
    }

    #[rstest]
    fn from_fixture_flattens_sequences() {
        let fixture = crate::fixture::parse_fixture(indoc! {"
            sequences:
              - ['var[a]->b', 'use->n']
              - ['request:body->body']
        "})
        .unwrap();
        let adapter = CheckAdapter::from_fixture(&fixture);
        assert_eq!(
            adapter.lines(),
            ["var[a]->b", "use->n", "request:body->body"]
        );
    }

    #[rstest]
    #[case::valid(
        "~?use:{1..2}->&first@",
        LineVerdict {
            command: "~?use:{1..2}->&first@".to_string(),
            valid: true,
            error: None,
            canonical: Some("~?use:{1..2}->&first@".to_string()),
        },
    )]
    #[case::semantic_error(
        "request:body->{x}",
        LineVerdict {
            command: "request:body->{x}".to_string(),
            valid: false,
            error: Some(
                "semantic error: requests are read-only; '->{...}' cannot target a request source"
                    .to_string(),
            ),
            canonical: None,
        },
    )]
    fn check_line_reports_validity(#[case] line: &str, #[case] expected: LineVerdict) {
        assert_eq!(check_line(line), expected);
    }

    #[rstest]
    fn check_line_reports_syntax_errors() {
        let verdict = check_line("nonsense");
        assert!(!verdict.valid);
        assert_eq!(verdict.error.as_deref(), Some("syntax error: not a P4 command: nonsense"));
    }

    #[rstest]
    fn line_verdict_json_omits_absent_fields() {
        let json = serde_json::to_value(check_line("nonsense")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "command": "nonsense",
                "valid": false,
                "error": "syntax error: not a P4 command: nonsense",
            })
        );
    }

    #[rstest]
    fn evaluate_checks_every_line() {
        let adapter =
            CheckAdapter::from_lines(vec!["var[a]->b".to_string(), "nonsense".to_string()]);
        let verdict = adapter.evaluate().unwrap();
        match &verdict {
            Verdict::Check(lines) => {
                assert_eq!(lines.len(), 2);
                assert!(lines[0].valid);
                assert!(!lines[1].valid);
            }
            other => panic!("expected Check verdict, got {other:?}"),
        }
        assert_eq!(adapter.handle_verdict(verdict).unwrap(), 1);
    }

    #[rstest]
    fn evaluate_without_lines_is_an_error() {
        let adapter = CheckAdapter::from_lines(Vec::new());
        assert!(adapter.evaluate().is_err());
    }

    #[rstest]
    fn handle_error_returns_exit_2() {
        let adapter = CheckAdapter::from_command("x".to_string());
        assert_eq!(adapter.handle_error(anyhow::anyhow!("boom")), 2);
    }
}
