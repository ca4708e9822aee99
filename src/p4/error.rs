/// The command text cannot be turned into a `Command`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("not a P4 command: {0}")]
    NoMatch(String),
    #[error("illegal source/action combination: {0}")]
    InvalidCombination(String),
    #[error("unescaped '}}->' inside braces: {0}")]
    UnescapedSeparator(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("invalid match pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("incomplete source: {0}")]
    Incomplete(String),
}

/// The command parses but cannot be executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("requests are read-only; '->{{...}}' cannot target a request source")]
    SelfWriteOnRequest,
    #[error("'->{{...}}' on a variable source needs a variable name")]
    SelfWriteOnNamelessVariable,
    #[error("command has neither a conditional nor an action")]
    NoConditionalOrAction,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum P4Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),
}

/// A sequence was rejected because one of its lines failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {index} ('{line}'): {source}")]
pub struct SequenceError {
    pub index: usize,
    pub line: String,
    pub source: P4Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // === SyntaxError ===

    #[rstest]
    #[case(SyntaxError::NoMatch("foo".to_string()), "not a P4 command: foo")]
    #[case(
        SyntaxError::UnescapedSeparator("a}->b".to_string()),
        "unescaped '}->' inside braces: a}->b"
    )]
    #[case(SyntaxError::InvalidNumber("3..x".to_string()), "invalid number: 3..x")]
    fn syntax_error_display(#[case] error: SyntaxError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    // === SemanticError ===

    #[rstest]
    #[case(
        SemanticError::SelfWriteOnRequest,
        "requests are read-only; '->{...}' cannot target a request source"
    )]
    #[case(
        SemanticError::NoConditionalOrAction,
        "command has neither a conditional nor an action"
    )]
    fn semantic_error_display(#[case] error: SemanticError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    // === P4Error ===

    #[test]
    fn p4_error_from_semantic_error() {
        let err: P4Error = SemanticError::SelfWriteOnRequest.into();
        assert!(err.to_string().starts_with("semantic error: requests are read-only"));
    }

    #[test]
    fn sequence_error_has_source() {
        let err = SequenceError {
            index: 2,
            line: "var".to_string(),
            source: SemanticError::NoConditionalOrAction.into(),
        };
        assert_eq!(
            err.to_string(),
            "line 2 ('var'): semantic error: command has neither a conditional nor an action"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn sequence_error_into_anyhow() {
        let err = SequenceError {
            index: 0,
            line: "x".to_string(),
            source: SyntaxError::NoMatch("x".to_string()).into(),
        };
        let anyhow_err: anyhow::Error = err.into();
        let chain: Vec<String> = anyhow_err.chain().map(|e| e.to_string()).collect();
        assert_eq!(chain[1], "syntax error: not a P4 command: x");
        assert_eq!(chain[2], "not a P4 command: x");
    }
}
