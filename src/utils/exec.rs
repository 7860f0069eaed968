//! Running the external tools gantry delegates to: stylesheet compilers,
//! the test runner, the doc generator and the backing server.
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Compile a stylesheet, capturing stdout
//! let css = Cmd::from_slice(&["sass", "--no-source-map", "app/main.scss"])
//!     .cwd(root)
//!     .filter(&STYLE_FILTER)
//!     .run()?
//!     .stdout;
//!
//! // Long-lived backing server
//! let child = Cmd::from_slice(&["node", "server.js"])
//!     .envs([("NODE_ENV", "development")])
//!     .spawn()?;
//! ```

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::log;

pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
    pty: bool,
    filter: &'static FilterRule,
}

impl Cmd {
    /// `["npx", "karma", "start"]` runs `npx` with two arguments. Empty
    /// arguments are dropped.
    pub fn from_slice<S: AsRef<OsStr>>(command: &[S]) -> Self {
        let (program, rest) = match command.split_first() {
            Some((program, rest)) => (program.as_ref().to_owned(), rest),
            None => (OsString::new(), &[][..]),
        };
        Self {
            program,
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            pty: false,
            filter: &QUIET_FILTER,
        }
        .args(rest)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|a| a.as_ref().to_owned())
                .filter(|a| !a.is_empty()),
        );
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.envs.extend(
            vars.into_iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// Run inside a pseudo-terminal so the tool keeps its colors and
    /// progress output.
    pub fn pty(mut self, enable: bool) -> Self {
        self.pty = enable;
        self
    }

    /// Which stderr lines are worth logging after a successful run.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = filter;
        self
    }

    /// Run to completion. A non-zero exit is an error carrying the tool's
    /// output.
    pub fn run(self) -> Result<Output> {
        self.check_installed()?;
        if self.pty {
            return self.run_in_pty();
        }

        let name = self.name();
        let output = self
            .command()
            .output()
            .with_context(|| format!("failed to execute `{name}`"))?;
        if !output.status.success() {
            bail!(failure_message(&name, &output));
        }
        self.filter.log(&name, &String::from_utf8_lossy(&output.stderr));
        Ok(output)
    }

    /// Start without waiting; stdout and stderr stay attached to ours.
    pub fn spawn(self) -> Result<Child> {
        self.check_installed()?;
        let name = self.name();
        self.command()
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn `{name}`"))
    }

    fn name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(self.envs.iter().cloned());
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        command
    }

    fn check_installed(&self) -> Result<()> {
        if self.program.is_empty() {
            bail!("empty command");
        }
        let program = Path::new(&self.program);
        let found = match &self.cwd {
            Some(dir) if program.components().count() > 1 => dir.join(program).exists(),
            _ => which::which(&self.program).is_ok() || program.exists(),
        };
        if !found {
            bail!("`{}` not found, is it installed?", self.name());
        }
        Ok(())
    }

    fn run_in_pty(self) -> Result<Output> {
        let name = self.name();
        let mut builder = CommandBuilder::new(&self.program);
        builder.args(&self.args);
        for (k, v) in &self.envs {
            builder.env(k, v);
        }
        if let Some(dir) = &self.cwd {
            builder.cwd(dir);
        }

        let pair = NativePtySystem::default().openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;
        let mut child = pair.slave.spawn_command(builder)?;
        drop(pair.slave);

        // The reader only sees EOF once the master side is dropped.
        let mut reader = pair.master.try_clone_reader()?;
        let collector = std::thread::spawn(move || {
            let mut text = String::new();
            let _ = reader.read_to_string(&mut text);
            text
        });
        let status = child.wait()?;
        drop(pair.master);
        let text = collector
            .join()
            .map_err(|_| anyhow!("output reader for `{name}` panicked"))?;

        if !status.success() {
            bail!("`{name}` exited with status {}\n{}", status.exit_code(), text.trim());
        }
        print!("{text}");

        Ok(Output {
            status: exit_status(status.exit_code()),
            stdout: text.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

#[cfg(unix)]
#[allow(clippy::cast_possible_wrap)]
fn exit_status(code: u32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw((code as i32) << 8)
}

#[cfg(windows)]
fn exit_status(code: u32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code)
}

fn failure_message(name: &str, output: &Output) -> String {
    let mut message = format!("`{name}` failed with {}", output.status);
    for stream in [&output.stderr, &output.stdout] {
        let text = String::from_utf8_lossy(stream);
        if !text.trim().is_empty() {
            message.push('\n');
            message.push_str(text.trim());
        }
    }
    message
}

// ============================================================================
// Argument variables
// ============================================================================

/// Substitute `$GANTRY_*` variables in command arguments.
///
/// Longer names go first so `$GANTRY_FILE_DIR` is not read as
/// `$GANTRY_FILE` followed by `_DIR`.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<_> = vars.keys().collect();
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    args.iter()
        .map(|arg| {
            keys.iter()
                .fold(arg.clone(), |acc, key| acc.replace(&format!("${key}"), &vars[*key]))
        })
        .collect()
}

// ============================================================================
// Output filtering
// ============================================================================

/// Stderr lines starting with one of `skip_prefixes` are not logged.
pub struct FilterRule {
    pub skip_prefixes: &'static [&'static str],
}

/// Log every non-empty stderr line.
pub const QUIET_FILTER: FilterRule = FilterRule { skip_prefixes: &[] };

/// Deprecation chatter from stylesheet compilers.
pub const STYLE_FILTER: FilterRule = FilterRule {
    skip_prefixes: &["DEPRECATION WARNING", "Deprecation Warning", "More info"],
};

impl FilterRule {
    fn keeps(&self, line: &str) -> bool {
        !line.is_empty() && !self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    pub fn log(&self, name: &str, output: &str) {
        let kept: Vec<_> = output
            .lines()
            .filter(|line| self.keeps(strip_ansi(line).trim()))
            .collect();
        if !kept.is_empty() {
            log!(name; "{}", kept.join("\n"));
        }
    }
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static ANSI: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi regex"));
    ANSI.replace_all(s, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_drops_empty_arguments() {
        let cmd = Cmd::from_slice(&["lessc", "", "--no-color"])
            .args(["app/main.less", ""])
            .cwd("/tmp");
        assert_eq!(cmd.program, OsString::from("lessc"));
        assert_eq!(cmd.args, vec![OsString::from("--no-color"), OsString::from("app/main.less")]);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_style_filter() {
        assert!(!STYLE_FILTER.keeps("DEPRECATION WARNING: slash division"));
        assert!(STYLE_FILTER.keeps("Error: undefined variable"));
        assert!(!QUIET_FILTER.keeps(""));
        assert_eq!(strip_ansi("\x1b[33mwarn\x1b[0m"), "warn");
    }

    #[test]
    fn test_resolve_args() {
        let mut vars = FxHashMap::default();
        vars.insert("GANTRY_FILE".to_string(), "app/main.scss".to_string());
        vars.insert("GANTRY_FILE_DIR".to_string(), "app".to_string());
        let args = vec![
            "--load-path=$GANTRY_FILE_DIR".to_string(),
            "$GANTRY_FILE".to_string(),
            "plain".to_string(),
        ];
        assert_eq!(
            resolve_args(&args, &vars),
            vec!["--load-path=app", "app/main.scss", "plain"]
        );
    }

    #[test]
    fn test_missing_program() {
        let err = Cmd::from_slice(&["gantry-no-such-tool"]).run().unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_carries_output() {
        let err = Cmd::from_slice(&["sh", "-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken"));
        assert!(message.contains("sh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let output = Cmd::from_slice(&["echo", "hello"]).run().unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
