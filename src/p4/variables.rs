use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variable namespace, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Lives for one sequence run.
    Local,
    /// Lives for one chapter visit. Written as `&`.
    Chapter,
    /// Lives for a whole test session. Written as `%`.
    TestBounds,
}

impl Scope {
    pub fn prefix(self) -> &'static str {
        match self {
            Scope::Local => "",
            Scope::Chapter => "&",
            Scope::TestBounds => "%",
        }
    }

    /// Scopes consulted by an upward search starting here.
    fn upward(self) -> &'static [Scope] {
        match self {
            Scope::Local => &[Scope::Local, Scope::Chapter, Scope::TestBounds],
            Scope::Chapter => &[Scope::Chapter, Scope::TestBounds],
            Scope::TestBounds => &[Scope::TestBounds],
        }
    }
}

/// Session-lifetime state shared by every chapter of one test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestBounds {
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Use counts of other chapters, addressed as `use[name]`.
    #[serde(default)]
    pub chapter_uses: BTreeMap<String, i64>,
}

/// The three variable scopes visible to a sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableStore {
    local: BTreeMap<String, String>,
    chapter: BTreeMap<String, String>,
    test_bounds: TestBounds,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_bounds(test_bounds: TestBounds) -> Self {
        Self {
            test_bounds,
            ..Self::default()
        }
    }

    pub fn scope(&self, scope: Scope) -> &BTreeMap<String, String> {
        match scope {
            Scope::Local => &self.local,
            Scope::Chapter => &self.chapter,
            Scope::TestBounds => &self.test_bounds.vars,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut BTreeMap<String, String> {
        match scope {
            Scope::Local => &mut self.local,
            Scope::Chapter => &mut self.chapter,
            Scope::TestBounds => &mut self.test_bounds.vars,
        }
    }

    pub fn get(&self, scope: Scope, name: &str) -> Option<&str> {
        self.scope(scope).get(name).map(String::as_str)
    }

    pub fn set(&mut self, scope: Scope, name: impl Into<String>, value: impl Into<String>) {
        self.scope_mut(scope).insert(name.into(), value.into());
    }

    /// Find `name` in `scope`, or walking upward from it when `search_up` is set.
    /// Stops at the first scope that defines the key, even if its value is empty.
    pub fn lookup(&self, scope: Scope, name: &str, search_up: bool) -> Option<(Scope, &str)> {
        if !search_up {
            return self.get(scope, name).map(|v| (scope, v));
        }
        scope
            .upward()
            .iter()
            .find_map(|s| self.get(*s, name).map(|v| (*s, v)))
    }

    /// First non-empty value of `name`, searching Local, Chapter, then TestBounds.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        Scope::Local
            .upward()
            .iter()
            .filter_map(|s| self.get(*s, name))
            .find(|v| !v.is_empty())
    }

    /// Every value of a scope, in byte-wise key order (`h10` sorts before `h2`),
    /// not insertion order.
    pub fn values(&self, scope: Scope) -> Vec<&str> {
        self.scope(scope).values().map(String::as_str).collect()
    }

    pub fn chapter_uses(&self, chapter: &str) -> Option<i64> {
        self.test_bounds.chapter_uses.get(chapter).copied()
    }

    pub fn set_chapter_uses(&mut self, chapter: impl Into<String>, uses: i64) {
        self.test_bounds.chapter_uses.insert(chapter.into(), uses);
    }

    /// Drop sequence-lifetime variables.
    pub fn clear_local(&mut self) {
        self.local.clear();
    }

    /// Start a new chapter visit: Local and Chapter start empty, TestBounds carries over.
    pub fn begin_chapter(&mut self) {
        self.local.clear();
        self.chapter.clear();
    }

    pub fn test_bounds(&self) -> &TestBounds {
        &self.test_bounds
    }

    pub fn into_test_bounds(self) -> TestBounds {
        self.test_bounds
    }
}
