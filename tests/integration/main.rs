mod session_replay;

use rstest::fixture;

use p4tape::p4::exchange::{HttpRequest, HttpResponse};
use p4tape::p4::sequence::Chapter;

fn chapter(name: &str, sequences: &[&[&str]]) -> Chapter {
    Chapter {
        name: name.to_string(),
        uses: 0,
        sequences: sequences
            .iter()
            .map(|lines| lines.iter().map(|l| l.to_string()).collect())
            .collect(),
    }
}

#[fixture]
fn login_request() -> HttpRequest {
    HttpRequest {
        method: "POST".to_string(),
        path: "/login".to_string(),
        headers: [("Content-Type", "application/json")].into_iter().collect(),
        body: r#"{"user": "alice", "password": "secret"}"#.to_string(),
    }
}

#[fixture]
fn login_response() -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: [("Set-Cookie", "session=recorded")].into_iter().collect(),
        body: r#"{"token": "recorded-token"}"#.to_string(),
    }
}
