use std::path::{Path, PathBuf};

use super::{Fixture, FixtureError, parse_fixture};

/// Trait for locating and reading a fixture file.
pub trait FixtureLoader {
    fn load(&self, cwd: &Path) -> Result<Fixture, FixtureError>;
}

/// Default implementation that reads from the filesystem.
#[derive(Debug, Default)]
pub struct DefaultFixtureLoader {
    path: Option<PathBuf>,
}

impl DefaultFixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always read `path`, ignoring the working directory.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// `p4tape.yml` is preferred; `p4tape.yaml` is a fallback.
    fn local_fixture_path(cwd: &Path) -> Option<PathBuf> {
        ["p4tape.yml", "p4tape.yaml"]
            .iter()
            .map(|name| cwd.join(name))
            .find(|p| p.exists())
    }
}

impl FixtureLoader for DefaultFixtureLoader {
    fn load(&self, cwd: &Path) -> Result<Fixture, FixtureError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::local_fixture_path(cwd)
                .ok_or_else(|| FixtureError::NotFound(cwd.to_path_buf()))?,
        };
        tracing::debug!(path = %path.display(), "loading fixture");

        let yaml = std::fs::read_to_string(&path)?;
        let fixture = parse_fixture(&yaml)?;
        fixture.validate()?;
        Ok(fixture)
    }
}
