//! External bundler command.
//!
//! `["esbuild", "{entry}", "--bundle"]` runs once per compilation with
//! `{entry}` replaced by the absolute entry path. Whatever the command
//! prints on stdout is the artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, bail};

use super::{Artifact, CompileFailure, Compiler};
use crate::config::section::ENTRY_PLACEHOLDER;
use crate::utils::exec::{Cmd, failure_output};

/// Compiles an entry by running a configured command.
#[derive(Debug)]
pub struct CommandCompiler {
    command: Vec<String>,
    cwd: PathBuf,
    name: String,
}

impl CommandCompiler {
    /// Checks that the program can be found before the broker starts.
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Result<Self> {
        let Some(program) = command.first() else {
            bail!("`compiler.command` is empty");
        };
        if which::which(program).is_err() && !cwd.join(program).is_file() {
            bail!("`{program}` not found. Install it or fix `compiler.command`");
        }
        if !command.iter().any(|arg| arg.contains(ENTRY_PLACEHOLDER)) {
            crate::log!("warning"; "`compiler.command` has no `{}` placeholder", ENTRY_PLACEHOLDER);
        }

        let name = Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());

        Ok(Self { command, cwd, name })
    }

    /// Command line for one entry.
    fn argv(&self, entry: &Path) -> Vec<String> {
        let entry = entry.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(ENTRY_PLACEHOLDER, &entry))
            .collect()
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, entry: &Path) -> Result<Artifact, CompileFailure> {
        let start = Instant::now();
        let argv = self.argv(entry);

        let output = Cmd::from_slice(&argv)
            .cwd(&self.cwd)
            .output()
            .map_err(|e| CompileFailure::new(format!("{e:#}")))?;

        crate::debug!("compile"; "{} {} in {:?}", self.name, entry.display(), start.elapsed());

        if !output.status.success() {
            let message = failure_output(&output);
            if message.is_empty() {
                return Err(CompileFailure::new(format!(
                    "`{}` failed with {}",
                    self.name, output.status
                )));
            }
            return Err(CompileFailure::new(message));
        }

        Ok(Artifact::from(output.stdout))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str, cwd: &Path) -> CommandCompiler {
        CommandCompiler::new(
            vec!["sh".into(), "-c".into(), script.into(), "sh".into(), "{entry}".into()],
            cwd.to_path_buf(),
        )
        .unwrap()
    }

    #[test]
    fn test_placeholder_substitution() {
        let compiler = CommandCompiler::new(
            vec!["cat".into(), "--".into(), "prefix={entry}".into()],
            PathBuf::from("/"),
        )
        .unwrap();
        assert_eq!(
            compiler.argv(Path::new("/app/a.js")),
            vec!["cat", "--", "prefix=/app/a.js"]
        );
        assert_eq!(compiler.name(), "cat");
    }

    #[test]
    fn test_stdout_is_artifact() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("a.spec.js");
        std::fs::write(&entry, "it('works')").unwrap();

        let compiler = sh("printf 'bundled:'; cat \"$1\"", temp.path());
        let artifact = compiler.compile(&entry).unwrap();
        assert_eq!(&*artifact, b"bundled:it('works')");
    }

    #[test]
    fn test_nonzero_exit_uses_trimmed_stderr() {
        let temp = TempDir::new().unwrap();
        let compiler = sh(
            "echo partial; echo 'Module parse failed: Unexpected token\n' >&2; exit 1",
            temp.path(),
        );
        let failure = compiler.compile(&temp.path().join("a.js")).unwrap_err();
        assert_eq!(failure.message, "Module parse failed: Unexpected token");
    }

    #[test]
    fn test_silent_failure_reports_status() {
        let temp = TempDir::new().unwrap();
        let compiler = sh("exit 2", temp.path());
        let failure = compiler.compile(&temp.path().join("a.js")).unwrap_err();
        assert!(failure.message.starts_with("`sh` failed"));
    }

    #[test]
    fn test_unknown_program_rejected() {
        let err = CommandCompiler::new(
            vec!["hotspec-no-such-bundler".into()],
            PathBuf::from("/"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
