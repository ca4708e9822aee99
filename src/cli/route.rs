use std::path::Path;

use crate::adapter::check_adapter::{CheckAdapter, CheckInput};
use crate::adapter::replay_adapter::ReplayAdapter;
use crate::fixture::{DefaultFixtureLoader, FixtureLoader};

use super::{CheckArgs, ReplayArgs};

/// Route `p4tape check` to a `CheckAdapter` based on CLI args and stdin content.
pub fn route_check(
    args: &CheckArgs,
    cwd: &Path,
    mut stdin: impl std::io::Read,
) -> Result<CheckAdapter, anyhow::Error> {
    // 1. --command CLI argument → single line, no stdin
    if let Some(command) = &args.command {
        return Ok(CheckAdapter::from_command(command.clone()));
    }

    // 2. --fixture → every sequence line of the fixture
    if let Some(path) = &args.fixture {
        let fixture = DefaultFixtureLoader::with_path(path.clone()).load(cwd)?;
        return Ok(CheckAdapter::from_fixture(&fixture));
    }

    // 3. Read stdin once
    let mut stdin_input = String::new();
    stdin.read_to_string(&mut stdin_input)?;

    // 4. A JSON object must carry a `command` field. Other JSON values are
    //    plain text, since P4 lines such as `{...}` never parse as objects anyway.
    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(&stdin_input)
        && json_value.is_object()
    {
        let input: CheckInput = serde_json::from_value(json_value)
            .map_err(|e| anyhow::anyhow!("Unknown input format: expected a 'command' field ({e})"))?;
        return Ok(CheckAdapter::from_stdin(input));
    }

    // 5. Plaintext: one command per line, skip empty lines
    let commands: Vec<String> = stdin_input
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if commands.is_empty() {
        return Err(anyhow::anyhow!("no commands provided on stdin"));
    }

    Ok(CheckAdapter::from_lines(commands))
}

/// Route `p4tape replay`: load the fixture named on the command line, or the
/// one in `cwd`.
pub fn route_replay(args: &ReplayArgs, cwd: &Path) -> Result<ReplayAdapter, anyhow::Error> {
    let loader = match &args.fixture {
        Some(path) => DefaultFixtureLoader::with_path(path.clone()),
        None => DefaultFixtureLoader::new(),
    };
    let fixture = loader.load(cwd)?;
    Ok(ReplayAdapter::new(fixture))
}
