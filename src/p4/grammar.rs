//! The single regular expression that recognizes one P4 command line, and the
//! predicates that judge which participating groups form a legal command.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::{P4Error, SemanticError, SyntaxError};

// Named groups of the grammar. Sources and actions use distinct names because
// the regex engine does not allow a name to appear twice.
pub const CONDITIONAL: &str = "cond";
pub const OPTIONAL: &str = "optional";
pub const REQUIRE_TRUE: &str = "require_true";
pub const REQUIRE_FALSE: &str = "require_false";
pub const REQRESP: &str = "reqresp";
pub const REQUEST: &str = "request";
pub const RESPONSE: &str = "response";
pub const HEAD: &str = "head";
pub const HEAD_KEY: &str = "head_key";
pub const BODY: &str = "body";
pub const REQRESP_MATCH: &str = "rr_match";
pub const VARIABLE: &str = "variable";
pub const VAR_CHAPTER: &str = "var_chapter";
pub const VAR_BOUNDS: &str = "var_bounds";
pub const SEARCH_UP: &str = "search_up";
pub const VAR_NAME: &str = "var_name";
pub const VAR_MATCH: &str = "var_match";
pub const USE: &str = "use";
pub const USE_CHAPTER: &str = "use_chapter";
pub const USE_EXPR: &str = "use_expr";
pub const ACTION: &str = "action";
pub const LITERAL: &str = "literal";
pub const TARGET: &str = "target";
pub const TARGET_CHAPTER: &str = "target_chapter";
pub const TARGET_BOUNDS: &str = "target_bounds";
pub const TARGET_NAME: &str = "target_name";
pub const FLAG_EXISTS: &str = "flag_exists";
pub const FLAG_COUNT: &str = "flag_count";
pub const FLAG_RESULT: &str = "flag_result";
pub const SPREAD_HASH: &str = "spread_hash";
pub const SPREAD_INDEX: &str = "spread_index";
pub const SPREAD_LAST: &str = "spread_last";

/// Sequence that separates a braced source body from the action.
pub const SEPARATOR: &str = "}->";

/// Names start with a letter and never end with `_`, so `name_#` always reads
/// as a name followed by a spread suffix.
const NAME: &str = r"[A-Za-z](?:[A-Za-z0-9_.\-]*[A-Za-z0-9.\-])?";
const DIGITS: &str = r"(?:0|[1-9][0-9]*)";

static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    let conditional = r"(?P<cond>(?P<optional>~)?(?:(?P<require_true>\?)|(?P<require_false>!)))?";
    let reqresp = concat!(
        r"(?P<reqresp>(?:(?P<request>request)|(?P<response>response)):",
        r"(?:(?P<head>head)(?:\[(?P<head_key>[^\]]+)\])?|(?P<body>body))",
        r"(?::\{(?P<rr_match>.*?)\})?)",
    );
    let variable = format!(
        r"(?P<variable>(?:(?P<var_chapter>&)|(?P<var_bounds>%))?(?P<search_up>\^)?var(?:\[(?P<var_name>{NAME})\])?(?::\{{(?P<var_match>.*?)\}})?)"
    );
    let num_term = format!(r"(?:{DIGITS}\.\.{DIGITS}|(?:>=|<=|>|<)?{DIGITS})");
    let use_source = format!(
        r"(?P<use>use(?:\[(?P<use_chapter>[^\]]+)\])?(?::\{{(?P<use_expr>{num_term}(?:,{num_term})*)\}})?)"
    );
    let target = format!(
        concat!(
            r"(?P<target>(?:(?P<target_chapter>&)|(?P<target_bounds>%))?(?P<target_name>{name})",
            r"(?P<flag_exists>\?)?(?P<flag_count>[#])?(?P<flag_result>@)?",
            r"(?:(?P<spread_hash>_[#](?P<spread_index>{digits})?)|(?P<spread_last>_\?))?)",
        ),
        name = NAME,
        digits = DIGITS,
    );
    let action = format!(r"(?P<action>->(?:\{{(?P<literal>.*)\}}|{target}))?");
    let pattern =
        format!(r"^{conditional}(?:{reqresp}|{variable}|{use_source}){action}$");
    Regex::new(&pattern).expect("P4 grammar must compile")
});

/// One participating named group of a grammar match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherResult {
    pub group: &'static str,
    pub value: String,
    pub span: Range<usize>,
}

/// Match one command line against the grammar.
///
/// Returns the participating named groups in pattern order, or an empty list
/// when the line is not a P4 command.
pub fn find_matches(line: &str) -> Vec<MatcherResult> {
    let grammar: &'static Regex = &GRAMMAR;
    let Some(captures) = grammar.captures(line) else {
        return Vec::new();
    };

    grammar
        .capture_names()
        .enumerate()
        .filter_map(|(index, name)| {
            let group = name?;
            let m = captures.get(index)?;
            Some(MatcherResult {
                group,
                value: m.as_str().to_string(),
                span: m.range(),
            })
        })
        .collect()
}

/// Look up a participating group by name.
pub fn group<'a>(matches: &'a [MatcherResult], name: &str) -> Option<&'a MatcherResult> {
    matches.iter().find(|m| m.group == name)
}

pub fn has_group(matches: &[MatcherResult], name: &str) -> bool {
    group(matches, name).is_some()
}

/// Check that the participating groups form a legal source/action combination.
pub fn check_syntax(matches: &[MatcherResult]) -> Result<(), P4Error> {
    if matches.is_empty() {
        return Err(SyntaxError::NoMatch("no grammar match".to_string()).into());
    }

    let source_kinds = [REQRESP, VARIABLE, USE]
        .iter()
        .filter(|name| has_group(matches, name))
        .count();
    if source_kinds != 1 {
        return Err(SyntaxError::InvalidCombination(format!(
            "expected exactly one source, found {source_kinds}"
        ))
        .into());
    }

    if has_group(matches, REQRESP) {
        let direction = has_group(matches, REQUEST) || has_group(matches, RESPONSE);
        let part = has_group(matches, HEAD) || has_group(matches, BODY);
        if !direction || !part {
            return Err(SyntaxError::Incomplete(
                "request/response source needs head or body".to_string(),
            )
            .into());
        }
    }

    for name in [REQRESP_MATCH, VAR_MATCH, LITERAL] {
        if let Some(m) = group(matches, name)
            && m.value.contains(SEPARATOR)
        {
            return Err(SyntaxError::UnescapedSeparator(m.value.clone()).into());
        }
    }

    if has_group(matches, LITERAL) {
        if has_group(matches, REQUEST) {
            return Err(SemanticError::SelfWriteOnRequest.into());
        }
        if has_group(matches, VARIABLE) && !has_group(matches, VAR_NAME) {
            return Err(SemanticError::SelfWriteOnNamelessVariable.into());
        }
    }

    Ok(())
}

/// True iff the participating groups form a legal source/action combination.
pub fn is_valid_syntax(matches: &[MatcherResult]) -> bool {
    check_syntax(matches).is_ok()
}

/// True iff the command is gated or acts; a bare source does nothing.
pub fn is_valid_request(matches: &[MatcherResult]) -> bool {
    has_group(matches, CONDITIONAL) || has_group(matches, ACTION)
}
