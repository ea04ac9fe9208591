//! Validated launch description for the backend.

use crate::config::BackendSettings;
use crate::{SupervisorError, SupervisorResult};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

const HOST_PLACEHOLDER: &str = "{host}";
const PORT_PLACEHOLDER: &str = "{port}";

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Program, argument list and working directory. No shell is involved, so
/// arguments reach the backend exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
}

impl BackendCommand {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
        }
    }

    /// Build from config; a relative working directory resolves against `base_dir`.
    pub fn from_settings(settings: &BackendSettings, base_dir: &Path) -> Self {
        let working_dir = Path::new(&settings.working_dir);
        let working_dir = if working_dir.is_absolute() {
            working_dir.to_path_buf()
        } else {
            base_dir.join(working_dir)
        };

        Self {
            program: PathBuf::from(&settings.program),
            args: settings.args.clone(),
            working_dir,
            env: settings.env.clone(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Arguments with `{host}` and `{port}` filled in.
    pub fn rendered_args(&self, host: &str, port: u16) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|a| a.replace(HOST_PLACEHOLDER, host).replace(PORT_PLACEHOLDER, &port))
            .collect()
    }

    /// Check the working directory and locate the executable.
    ///
    /// Returns the program path that will actually be executed.
    pub fn validate(&self) -> SupervisorResult<PathBuf> {
        if !self.working_dir.is_dir() {
            return Err(SupervisorError::spawn(
                format!(
                    "working directory {} does not exist",
                    self.working_dir.display()
                ),
                None,
            ));
        }

        self.resolve_program().ok_or_else(|| {
            SupervisorError::spawn(
                format!("executable {} not found", self.program.display()),
                None,
            )
        })
    }

    fn resolve_program(&self) -> Option<PathBuf> {
        let has_separator = self.program.components().count() > 1;

        if self.program.is_absolute() || has_separator {
            let candidate = if self.program.is_absolute() {
                self.program.clone()
            } else {
                self.working_dir.join(&self.program)
            };
            return candidate.is_file().then_some(candidate);
        }

        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            executable_candidates(&self.program)
                .into_iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Build the tokio command with both output pipes captured.
    pub(crate) fn to_command(&self, program: &Path, host: &str, port: u16) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(self.rendered_args(host, port))
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so CTRL_BREAK reaches only the backend. The child
        // keeps the shell's console: without one the event is never delivered.
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);

        cmd
    }
}

#[cfg(windows)]
fn executable_candidates(program: &Path) -> Vec<PathBuf> {
    if program.extension().is_some() {
        return vec![program.to_path_buf()];
    }
    ["exe", "cmd", "bat"]
        .iter()
        .map(|ext| program.with_extension(ext))
        .chain(std::iter::once(program.to_path_buf()))
        .collect()
}

#[cfg(not(windows))]
fn executable_candidates(program: &Path) -> Vec<PathBuf> {
    vec![program.to_path_buf()]
}
