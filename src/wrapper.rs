//! Generated `/bin/sh` wrapper scripts.

use serde::Serialize;

use crate::commands;

/// Shebang line of every generated wrapper.
pub const SHEBANG: &str = "#!/bin/sh";

/// Permission bits of every generated wrapper.
pub const WRAPPER_MODE: u32 = 0o755;

/// A shell script generated at descriptor evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperScript {
    /// Absolute path inside the image.
    pub path: String,
    pub body: String,
}

impl WrapperScript {
    pub fn new(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
        }
    }

    /// Build a wrapper whose body runs `statements` in sequence, stopping
    /// at the first failure.
    pub fn chained<S: AsRef<str>>(path: impl Into<String>, statements: &[S]) -> Self {
        let body = statements
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" && ");
        Self::new(path, body)
    }

    /// File content as written into the image.
    pub fn render(&self) -> String {
        format!("{}\n{}\n", SHEBANG, self.body)
    }

    /// The build command that writes this script inside the image.
    pub fn command(&self) -> String {
        commands::create_shell_wrapper(&self.body, &self.path)
    }

    pub fn mode(&self) -> u32 {
        WRAPPER_MODE
    }
}
