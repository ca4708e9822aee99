//! Structured form of one P4 command line.
//!
//! `Command::parse` and `Display` are exact inverses for every line the
//! grammar accepts: the persisted text is the source of truth, so rendering
//! never normalizes anything.

use std::fmt;

use regex::Regex;

use super::grammar::{self, MatcherResult, group, has_group};
use super::numeric::NumericExpr;
use super::template::TemplateString;
use super::variables::Scope;
use super::{P4Error, SemanticError, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Require {
    /// `?`: the source must match.
    True,
    /// `!`: the source must not match.
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditional {
    /// `~`: on gate failure still run the action, writing the failure.
    pub optional: bool,
    pub require: Require,
}

/// A compiled `:{...}` match body that keeps its source text.
#[derive(Debug, Clone)]
pub struct MatchPattern {
    text: String,
    regex: Regex,
}

impl MatchPattern {
    pub fn new(text: &str) -> Result<Self, SyntaxError> {
        let regex = Regex::new(text).map_err(|e| SyntaxError::InvalidPattern {
            pattern: text.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            text: text.to_string(),
            regex,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for MatchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for MatchPattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    RequestHead {
        key: Option<String>,
        pattern: Option<MatchPattern>,
    },
    RequestBody {
        pattern: Option<MatchPattern>,
    },
    ResponseHead {
        key: Option<String>,
        pattern: Option<MatchPattern>,
    },
    ResponseBody {
        pattern: Option<MatchPattern>,
    },
    /// `var[name]` reads one value. A nameless `var` reads every value of
    /// `scope` in byte-wise key order (see [`VariableStore::values`]).
    ///
    /// [`VariableStore::values`]: super::variables::VariableStore::values
    Variable {
        scope: Scope,
        search_up: bool,
        name: Option<String>,
        pattern: Option<MatchPattern>,
    },
    Use {
        chapter: Option<String>,
        expr: Option<NumericExpr>,
    },
}

impl Source {
    pub fn is_request(&self) -> bool {
        matches!(self, Source::RequestHead { .. } | Source::RequestBody { .. })
    }

    pub fn pattern(&self) -> Option<&MatchPattern> {
        match self {
            Source::RequestHead { pattern, .. }
            | Source::RequestBody { pattern }
            | Source::ResponseHead { pattern, .. }
            | Source::ResponseBody { pattern }
            | Source::Variable { pattern, .. } => pattern.as_ref(),
            Source::Use { .. } => None,
        }
    }
}

/// Spread suffix of a variable target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Spread {
    #[default]
    None,
    /// `_#`: every value as `name_0 .. name_N`.
    All,
    /// `_?`: the last value as `name_?`.
    Last,
    /// `_#N`: value N as `name_#N`.
    Index(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetFlags {
    /// `?`: also write `name?` (whether the source matched).
    pub exists: bool,
    /// `#`: also write `name#` (how many values matched).
    pub count: bool,
    /// `@`: also write `name@` (the gate result).
    pub result: bool,
    pub spread: Spread,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToVariable {
        scope: Scope,
        name: String,
        flags: TargetFlags,
    },
    ToSelf {
        template: TemplateString,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub conditional: Option<Conditional>,
    pub source: Source,
    pub action: Option<Action>,
}

/// Outcome of building a `Command` from grammar matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBuild {
    Valid(Command),
    Invalid(SyntaxError),
}

impl Command {
    /// Parse one command line. Semantic problems are not checked here; see
    /// [`Command::validate`] and [`Command::compile`].
    pub fn parse(line: &str) -> Result<Command, SyntaxError> {
        let matches = grammar::find_matches(line);
        if matches.is_empty() {
            return Err(SyntaxError::NoMatch(line.to_string()));
        }
        if let Err(P4Error::Syntax(e)) = grammar::check_syntax(&matches) {
            return Err(e);
        }
        match Command::from_matches(&matches) {
            CommandBuild::Valid(command) => Ok(command),
            CommandBuild::Invalid(e) => Err(e),
        }
    }

    /// Parse and validate one command line for execution.
    pub fn compile(line: &str) -> Result<Command, P4Error> {
        let command = Command::parse(line)?;
        command.validate()?;
        Ok(command)
    }

    pub fn from_matches(matches: &[MatcherResult]) -> CommandBuild {
        match build(matches) {
            Ok(command) => CommandBuild::Valid(command),
            Err(e) => CommandBuild::Invalid(e),
        }
    }

    pub fn is_valid_request(&self) -> bool {
        self.conditional.is_some() || self.action.is_some()
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        if !self.is_valid_request() {
            return Err(SemanticError::NoConditionalOrAction);
        }
        if let Some(Action::ToSelf { .. }) = &self.action {
            if self.source.is_request() {
                return Err(SemanticError::SelfWriteOnRequest);
            }
            if let Source::Variable { name: None, .. } = &self.source {
                return Err(SemanticError::SelfWriteOnNamelessVariable);
            }
        }
        Ok(())
    }
}

fn value<'a>(matches: &'a [MatcherResult], name: &str) -> Option<&'a str> {
    group(matches, name).map(|m| m.value.as_str())
}

fn pattern_of(matches: &[MatcherResult], name: &str) -> Result<Option<MatchPattern>, SyntaxError> {
    value(matches, name).map(MatchPattern::new).transpose()
}

fn scope_of(matches: &[MatcherResult], chapter: &str, bounds: &str) -> Scope {
    if has_group(matches, chapter) {
        Scope::Chapter
    } else if has_group(matches, bounds) {
        Scope::TestBounds
    } else {
        Scope::Local
    }
}

fn build(matches: &[MatcherResult]) -> Result<Command, SyntaxError> {
    let conditional = has_group(matches, grammar::CONDITIONAL).then(|| Conditional {
        optional: has_group(matches, grammar::OPTIONAL),
        require: if has_group(matches, grammar::REQUIRE_FALSE) {
            Require::False
        } else {
            Require::True
        },
    });

    Ok(Command {
        conditional,
        source: build_source(matches)?,
        action: build_action(matches)?,
    })
}

fn build_source(matches: &[MatcherResult]) -> Result<Source, SyntaxError> {
    if has_group(matches, grammar::REQRESP) {
        let key = value(matches, grammar::HEAD_KEY).map(str::to_string);
        let pattern = pattern_of(matches, grammar::REQRESP_MATCH)?;
        let head = has_group(matches, grammar::HEAD);
        let body = has_group(matches, grammar::BODY);
        let request = has_group(matches, grammar::REQUEST);
        let response = has_group(matches, grammar::RESPONSE);

        return match (request, response, head, body) {
            (true, false, true, false) => Ok(Source::RequestHead { key, pattern }),
            (true, false, false, true) => Ok(Source::RequestBody { pattern }),
            (false, true, true, false) => Ok(Source::ResponseHead { key, pattern }),
            (false, true, false, true) => Ok(Source::ResponseBody { pattern }),
            _ => Err(SyntaxError::Incomplete(
                "request/response source needs exactly one of head or body".to_string(),
            )),
        };
    }

    if has_group(matches, grammar::VARIABLE) {
        return Ok(Source::Variable {
            scope: scope_of(matches, grammar::VAR_CHAPTER, grammar::VAR_BOUNDS),
            search_up: has_group(matches, grammar::SEARCH_UP),
            name: value(matches, grammar::VAR_NAME).map(str::to_string),
            pattern: pattern_of(matches, grammar::VAR_MATCH)?,
        });
    }

    if has_group(matches, grammar::USE) {
        let expr = value(matches, grammar::USE_EXPR)
            .map(str::parse::<NumericExpr>)
            .transpose()?;
        return Ok(Source::Use {
            chapter: value(matches, grammar::USE_CHAPTER).map(str::to_string),
            expr,
        });
    }

    Err(SyntaxError::Incomplete("no source selected".to_string()))
}

fn build_action(matches: &[MatcherResult]) -> Result<Option<Action>, SyntaxError> {
    if !has_group(matches, grammar::ACTION) {
        return Ok(None);
    }

    if let Some(literal) = value(matches, grammar::LITERAL) {
        return Ok(Some(Action::ToSelf {
            template: TemplateString::parse(literal),
        }));
    }

    let Some(name) = value(matches, grammar::TARGET_NAME) else {
        return Err(SyntaxError::Incomplete("action has no target".to_string()));
    };

    let spread = if has_group(matches, grammar::SPREAD_LAST) {
        Spread::Last
    } else if let Some(index) = value(matches, grammar::SPREAD_INDEX) {
        let index = index
            .parse::<u32>()
            .map_err(|_| SyntaxError::InvalidNumber(index.to_string()))?;
        Spread::Index(index)
    } else if has_group(matches, grammar::SPREAD_HASH) {
        Spread::All
    } else {
        Spread::None
    };

    Ok(Some(Action::ToVariable {
        scope: scope_of(matches, grammar::TARGET_CHAPTER, grammar::TARGET_BOUNDS),
        name: name.to_string(),
        flags: TargetFlags {
            exists: has_group(matches, grammar::FLAG_EXISTS),
            count: has_group(matches, grammar::FLAG_COUNT),
            result: has_group(matches, grammar::FLAG_RESULT),
            spread,
        },
    }))
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            f.write_str("~")?;
        }
        match self.require {
            Require::True => f.write_str("?"),
            Require::False => f.write_str("!"),
        }
    }
}

fn write_pattern(f: &mut fmt::Formatter<'_>, pattern: &Option<MatchPattern>) -> fmt::Result {
    match pattern {
        Some(p) => write!(f, ":{{{}}}", p.as_str()),
        None => Ok(()),
    }
}

fn write_head(
    f: &mut fmt::Formatter<'_>,
    direction: &str,
    key: &Option<String>,
    pattern: &Option<MatchPattern>,
) -> fmt::Result {
    write!(f, "{direction}:head")?;
    if let Some(key) = key {
        write!(f, "[{key}]")?;
    }
    write_pattern(f, pattern)
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::RequestHead { key, pattern } => write_head(f, "request", key, pattern),
            Source::ResponseHead { key, pattern } => write_head(f, "response", key, pattern),
            Source::RequestBody { pattern } => {
                f.write_str("request:body")?;
                write_pattern(f, pattern)
            }
            Source::ResponseBody { pattern } => {
                f.write_str("response:body")?;
                write_pattern(f, pattern)
            }
            Source::Variable {
                scope,
                search_up,
                name,
                pattern,
            } => {
                f.write_str(scope.prefix())?;
                if *search_up {
                    f.write_str("^")?;
                }
                f.write_str("var")?;
                if let Some(name) = name {
                    write!(f, "[{name}]")?;
                }
                write_pattern(f, pattern)
            }
            Source::Use { chapter, expr } => {
                f.write_str("use")?;
                if let Some(chapter) = chapter {
                    write!(f, "[{chapter}]")?;
                }
                if let Some(expr) = expr {
                    write!(f, ":{{{expr}}}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spread::None => Ok(()),
            Spread::All => f.write_str("_#"),
            Spread::Last => f.write_str("_?"),
            Spread::Index(i) => write!(f, "_#{i}"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("->")?;
        match self {
            Action::ToSelf { template } => write!(f, "{{{template}}}"),
            Action::ToVariable { scope, name, flags } => {
                write!(f, "{}{name}", scope.prefix())?;
                if flags.exists {
                    f.write_str("?")?;
                }
                if flags.count {
                    f.write_str("#")?;
                }
                if flags.result {
                    f.write_str("@")?;
                }
                write!(f, "{}", flags.spread)
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(conditional) = &self.conditional {
            write!(f, "{conditional}")?;
        }
        write!(f, "{}", self.source)?;
        if let Some(action) = &self.action {
            write!(f, "{action}")?;
        }
        Ok(())
    }
}
