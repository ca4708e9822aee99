//! Runs validated commands against one chapter visit.
//!
//! Each command goes through the same three steps: evaluate its source into a
//! [`MatchOutcome`], apply the conditional gate, then apply the action. Nothing
//! here fails: a lookup that finds no data degrades to an empty or `"false"`
//! value and the next command runs.

use regex::{Captures, Regex};

use super::command::{Action, Command, MatchPattern, Require, Source, Spread, TargetFlags};
use super::exchange::{Headers, HttpRequest, HttpResponse};
use super::template::{StoreResolver, TemplateString};
use super::variables::{Scope, VariableStore};

/// What a source yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Every matching value, in order.
    pub captured: Vec<String>,
    /// The canonical (first) value, present only when the source matched.
    pub raw: Option<String>,
    /// Capture groups of the first regex match; index 0 is the whole match.
    pub groups: Vec<String>,
}

impl MatchOutcome {
    fn miss() -> Self {
        Self::default()
    }

    fn from_captured(captured: Vec<String>, groups: Vec<String>) -> Self {
        Self {
            matched: !captured.is_empty(),
            raw: captured.first().cloned(),
            captured,
            groups,
        }
    }
}

/// How one command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The gate failed and the command was not optional.
    Skipped,
    /// The gate passed and there is no action.
    Checked,
    /// The action ran; `passed` is the gate result it saw.
    Applied { passed: bool },
}

/// Exclusive access to everything one chapter visit may read or change.
pub struct ChapterVisit<'a> {
    pub request: &'a HttpRequest,
    pub response: &'a mut HttpResponse,
    pub store: &'a mut VariableStore,
    /// Use counter of the chapter being visited.
    pub uses: &'a mut i64,
}

impl<'a> ChapterVisit<'a> {
    pub fn new(
        request: &'a HttpRequest,
        response: &'a mut HttpResponse,
        store: &'a mut VariableStore,
        uses: &'a mut i64,
    ) -> Self {
        Self {
            request,
            response,
            store,
            uses,
        }
    }

    /// Run a command list once, in order, then drop its Local scope.
    pub fn run(&mut self, commands: &[Command]) -> Vec<CommandOutcome> {
        let outcomes = commands.iter().map(|c| self.execute(c)).collect();
        self.store.clear_local();
        outcomes
    }

    pub fn execute(&mut self, command: &Command) -> CommandOutcome {
        let outcome = self.evaluate_source(&command.source);

        let passed = match command.conditional {
            // An ungated rewrite always applies; an ungated extraction needs a match.
            None => {
                outcome.matched || matches!(command.action, Some(Action::ToSelf { .. }))
            }
            Some(c) => outcome.matched != (c.require == Require::False),
        };
        let optional = command.conditional.is_some_and(|c| c.optional);

        if !passed && !optional {
            tracing::debug!(%command, matched = outcome.matched, "gate failed, skipping");
            return CommandOutcome::Skipped;
        }

        let Some(action) = &command.action else {
            tracing::debug!(%command, "gate passed");
            return CommandOutcome::Checked;
        };

        match action {
            Action::ToVariable { scope, name, flags } => {
                write_variable(self.store, *scope, name, flags, &outcome, passed);
            }
            Action::ToSelf { template } => {
                self.write_self(&command.source, template, &outcome, passed);
            }
        }
        tracing::debug!(%command, passed, "applied");
        CommandOutcome::Applied { passed }
    }

    pub fn evaluate_source(&self, source: &Source) -> MatchOutcome {
        match source {
            Source::RequestHead { key, pattern } => {
                match_headers(&self.request.headers, key.as_deref(), pattern.as_ref())
            }
            Source::ResponseHead { key, pattern } => {
                match_headers(&self.response.headers, key.as_deref(), pattern.as_ref())
            }
            Source::RequestBody { pattern } => match_text(&self.request.body, pattern.as_ref()),
            Source::ResponseBody { pattern } => match_text(&self.response.body, pattern.as_ref()),
            Source::Variable {
                scope,
                search_up,
                name: Some(name),
                pattern,
            } => match self.store.lookup(*scope, name, *search_up) {
                Some((_, value)) => match pattern {
                    Some(p) => match_all(value, p.regex()),
                    None => MatchOutcome::from_captured(vec![value.to_string()], Vec::new()),
                },
                None => MatchOutcome::miss(),
            },
            Source::Variable {
                scope,
                name: None,
                pattern,
                ..
            } => match_values(self.store.values(*scope), pattern.as_ref()),
            Source::Use { chapter, expr } => {
                let count = match chapter {
                    Some(chapter) => self.store.chapter_uses(chapter),
                    None => Some(*self.uses),
                };
                let Some(count) = count else {
                    return MatchOutcome::miss();
                };
                if expr.as_ref().is_some_and(|e| !e.evaluate(count)) {
                    return MatchOutcome::miss();
                }
                MatchOutcome::from_captured(vec![count.to_string()], Vec::new())
            }
        }
    }

    fn write_self(
        &mut self,
        source: &Source,
        template: &TemplateString,
        outcome: &MatchOutcome,
        passed: bool,
    ) {
        if !passed {
            // Only a variable has something to record a failure into.
            if let Source::Variable {
                scope,
                name: Some(name),
                ..
            } = source
            {
                self.store.set(*scope, name.as_str(), "false");
            }
            return;
        }

        match source {
            Source::ResponseBody { pattern } => {
                let body = rewrite_text(&self.response.body, pattern.as_ref(), template, self.store);
                self.response.body = body;
            }
            Source::ResponseHead { key, pattern } => {
                rewrite_headers(
                    &mut self.response.headers,
                    key.as_deref(),
                    pattern.as_ref(),
                    template,
                    self.store,
                );
            }
            Source::Variable {
                scope,
                name: Some(name),
                ..
            } => {
                let rendered = render(template, self.store, &outcome.groups);
                self.store.set(*scope, name.as_str(), rendered);
            }
            Source::Use { chapter, expr } => {
                let rendered = render(template, self.store, &outcome.groups);
                let Ok(uses) = rendered.trim().parse::<i64>() else {
                    tracing::debug!(value = %rendered, "use rewrite is not a number, ignoring");
                    return;
                };
                if expr.as_ref().is_some_and(|e| !e.evaluate(uses)) {
                    tracing::debug!(uses, "use rewrite outside its expression, ignoring");
                    return;
                }
                match chapter {
                    Some(chapter) => self.store.set_chapter_uses(chapter.as_str(), uses),
                    None => *self.uses = uses,
                }
            }
            Source::RequestHead { .. } | Source::RequestBody { .. } | Source::Variable { .. } => {
                tracing::warn!(%source, "source cannot be rewritten, ignoring");
            }
        }
    }
}

fn render(template: &TemplateString, store: &VariableStore, groups: &[String]) -> String {
    template.render(&StoreResolver { store, groups })
}

fn group_values(captures: &Captures<'_>) -> Vec<String> {
    captures
        .iter()
        .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
        .collect()
}

/// The first participating capture group, or the whole match.
fn first_group(captures: &Captures<'_>) -> String {
    captures
        .iter()
        .skip(1)
        .flatten()
        .next()
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Every match of `regex` in `text`.
fn match_all(text: &str, regex: &Regex) -> MatchOutcome {
    let mut groups = Vec::new();
    let mut captured = Vec::new();
    for captures in regex.captures_iter(text) {
        if captured.is_empty() {
            groups = group_values(&captures);
        }
        captured.push(first_group(&captures));
    }
    MatchOutcome::from_captured(captured, groups)
}

fn match_text(text: &str, pattern: Option<&MatchPattern>) -> MatchOutcome {
    match pattern {
        Some(p) => match_all(text, p.regex()),
        None if text.is_empty() => MatchOutcome::miss(),
        None => MatchOutcome::from_captured(vec![text.to_string()], vec![text.to_string()]),
    }
}

/// Each value matches on its own; a pattern keeps only the values it finds.
fn match_values<'v>(
    values: impl IntoIterator<Item = &'v str>,
    pattern: Option<&MatchPattern>,
) -> MatchOutcome {
    let mut groups = Vec::new();
    let mut captured = Vec::new();
    for value in values {
        match pattern {
            Some(p) => {
                if let Some(captures) = p.regex().captures(value) {
                    if captured.is_empty() {
                        groups = group_values(&captures);
                    }
                    captured.push(first_group(&captures));
                }
            }
            None => captured.push(value.to_string()),
        }
    }
    MatchOutcome::from_captured(captured, groups)
}

fn match_headers(
    headers: &Headers,
    key: Option<&str>,
    pattern: Option<&MatchPattern>,
) -> MatchOutcome {
    match key {
        Some(key) => match headers.get_all(key) {
            Some(values) => match_values(values.iter().map(String::as_str), pattern),
            None => MatchOutcome::miss(),
        },
        None => match_values(
            headers
                .iter()
                .flat_map(|(_, values)| values.iter().map(String::as_str)),
            pattern,
        ),
    }
}

fn write_variable(
    store: &mut VariableStore,
    scope: Scope,
    name: &str,
    flags: &TargetFlags,
    outcome: &MatchOutcome,
    passed: bool,
) {
    let value = outcome
        .raw
        .clone()
        .filter(|_| passed)
        .unwrap_or_else(|| passed.to_string());
    store.set(scope, name, value);

    if flags.exists {
        store.set(scope, format!("{name}?"), outcome.matched.to_string());
    }
    if flags.count {
        store.set(scope, format!("{name}#"), outcome.captured.len().to_string());
    }
    if flags.result {
        store.set(scope, format!("{name}@"), passed.to_string());
    }

    let spread: &[String] = if passed { &outcome.captured } else { &[] };
    match flags.spread {
        Spread::None => {}
        Spread::All => {
            for (i, value) in spread.iter().enumerate() {
                store.set(scope, format!("{name}_{i}"), value.as_str());
            }
        }
        Spread::Last => {
            if let Some(value) = spread.last() {
                store.set(scope, format!("{name}_?"), value.as_str());
            }
        }
        Spread::Index(i) => {
            if let Some(value) = spread.get(i as usize) {
                store.set(scope, format!("{name}_#{i}"), value.as_str());
            }
        }
    }
}

/// Replace every match in `text` (or the whole text) with the rendered template.
/// Each match renders with its own capture groups.
fn rewrite_text(
    text: &str,
    pattern: Option<&MatchPattern>,
    template: &TemplateString,
    store: &VariableStore,
) -> String {
    match pattern {
        Some(p) => p
            .regex()
            .replace_all(text, |captures: &Captures<'_>| {
                render(template, store, &group_values(captures))
            })
            .into_owned(),
        None => render(template, store, &[text.to_string()]),
    }
}

/// Replace every header value that currently matches.
fn rewrite_headers(
    headers: &mut Headers,
    key: Option<&str>,
    pattern: Option<&MatchPattern>,
    template: &TemplateString,
    store: &VariableStore,
) {
    let rewrite = |values: &mut Vec<String>| {
        for value in values.iter_mut() {
            let groups = match pattern {
                Some(p) => match p.regex().captures(value) {
                    Some(captures) => group_values(&captures),
                    None => continue,
                },
                None => vec![value.clone()],
            };
            *value = render(template, store, &groups);
        }
    };

    match key {
        Some(key) => {
            if let Some(values) = headers.get_all_mut(key) {
                rewrite(values);
            }
        }
        None => headers.values_mut().for_each(rewrite),
    }
}
