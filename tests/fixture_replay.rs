use std::fs;

use indoc::{formatdoc, indoc};
use rstest::rstest;
use tempfile::TempDir;

use p4tape::adapter::Verdict;
use p4tape::adapter::{Endpoint, check_adapter::CheckAdapter};
use p4tape::cli::{ReplayArgs, route_replay};
use p4tape::fixture::{DefaultFixtureLoader, FixtureError, FixtureLoader, parse_fixture};
use p4tape::p4::variables::Scope;

// ========================================
// YAML fixture loading and replay
// ========================================

#[rstest]
fn replay_extracts_and_rewrites() {
    let fixture = parse_fixture(indoc! {r#"
        chapter: orders
        request:
          method: POST
          path: /orders
          headers:
            X-Request-Id: req-42
          body: '{"sku": "A-17", "qty": 3}'
        response:
          status: 201
          headers:
            Location: /orders/PLACEHOLDER
          body: '{"id": "PLACEHOLDER", "sku": "?"}'
        sequences:
          - - 'request:body:{"sku": "([^"]+)"}->&sku'
            - 'request:head[x-request-id]:{req-(\d+)}->&id'
            - 'response:body:{PLACEHOLDER}->{@{&id}}'
            - 'response:body:{"\?"}->{"@{&sku}"}'
            - 'response:head[Location]:{PLACEHOLDER}->{/orders/@{&id}}'
    "#})
    .unwrap();

    let outcome = fixture.replay();
    assert_eq!(outcome.response.status, 201);
    assert_eq!(outcome.response.body, r#"{"id": "42", "sku": "A-17"}"#);
    assert_eq!(outcome.response.headers.get("location"), Some("/orders/42"));
    assert_eq!(outcome.store.get(Scope::Chapter, "sku"), Some("A-17"));
}

#[rstest]
fn bad_sequence_only_disables_itself() {
    let fixture = parse_fixture(indoc! {"
        response:
          body: original
        sequences:
          - ['response:body:{original}->{first}']
          - ['response:body->{lost}', 'request:head->{forbidden}']
          - ['response:body:{first}->{second}']
    "})
    .unwrap();

    let outcome = fixture.replay();
    assert_eq!(outcome.response.body, "second");
    assert_eq!(outcome.report.rejected.len(), 1);
    assert_eq!(outcome.report.rejected[0].sequence, 1);
    assert_eq!(outcome.report.rejected[0].error.index, 1);
}

#[rstest]
fn local_scope_does_not_leak_between_sequences() {
    let fixture = parse_fixture(indoc! {r#"
        request:
          body: "token=abc"
        sequences:
          - ['request:body:{token=(\w+)}->token', 'var[token]->&seen_in_first']
          - ['~?var[token]->seen_in_second']
          - ['~?var[token]->&seen_in_third']
    "#})
    .unwrap();

    let outcome = fixture.replay();
    assert_eq!(outcome.store.get(Scope::Chapter, "seen_in_first"), Some("abc"));
    assert_eq!(outcome.store.get(Scope::Chapter, "seen_in_third"), Some("false"));
    assert!(outcome.store.scope(Scope::Local).is_empty());
}

#[rstest]
#[case::first_visit(0, "fresh")]
#[case::later_visit(4, "again")]
fn use_counter_gates_on_visit_number(#[case] uses: i64, #[case] expected: &str) {
    let fixture = parse_fixture(&formatdoc! {"
        uses: {uses}
        sequences:
          - ['?use:{{1}}->&first', '?&var[first]->{{fresh}}']
          - ['?use:{{>1}}->&later', '?&var[later]->{{again}}']
    "})
    .unwrap();

    let outcome = fixture.replay();
    assert_eq!(outcome.uses, uses + 1);
    let written = outcome
        .store
        .get(Scope::Chapter, "first")
        .or_else(|| outcome.store.get(Scope::Chapter, "later"));
    assert_eq!(written, Some(expected));
}

// ========================================
// Loader and endpoints
// ========================================

#[rstest]
fn loader_rejects_invalid_structure() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("p4tape.yml"),
        indoc! {"
            chapter: ''
            uses: -1
            chapter_uses: { other: -3 }
        "},
    )
    .unwrap();

    match DefaultFixtureLoader::new().load(tmp.path()) {
        Err(FixtureError::Validation(errors)) => assert_eq!(errors.len(), 3),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[rstest]
fn replay_endpoint_reports_rejections_through_exit_code() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("p4tape.yaml"),
        "sequences:\n  - ['request:body->{x}']\n",
    )
    .unwrap();

    let adapter = route_replay(&ReplayArgs { fixture: None }, tmp.path()).unwrap();
    let verdict = adapter.evaluate().unwrap();
    assert!(!verdict.accepted());
    assert_eq!(verdict.exit_code(), 1);
}

#[rstest]
fn check_endpoint_flags_each_fixture_line() {
    let fixture = parse_fixture(indoc! {"
        sequences:
          - ['request:head[Host]->host', 'response:head->{x}']
          - ['var[a]']
    "})
    .unwrap();

    let verdict = CheckAdapter::from_fixture(&fixture).evaluate().unwrap();
    let Verdict::Check(lines) = verdict else {
        panic!("expected Check verdict");
    };
    let valid: Vec<bool> = lines.iter().map(|l| l.valid).collect();
    assert_eq!(valid, vec![true, true, false]);
    assert_eq!(lines[0].canonical.as_deref(), Some("request:head[Host]->host"));
}
