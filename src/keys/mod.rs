//! Local SSH key material.
//!
//! The provisioner asks a [`KeySource`] for the public key to install on the
//! instance. [`SshKeygen`] generates an ed25519 keypair with `ssh-keygen` the
//! first time it is asked and reads the existing `.pub` file afterwards.

mod runner;

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use thiserror::Error;
use tracing::info;

pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner};

/// Errors raised while producing key material.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum KeyError {
    /// The keypair could not be generated.
    #[error("failed to generate SSH key: {message}")]
    Generate {
        /// Description of the failure.
        message: String,
    },
    /// The public key could not be read.
    #[error("failed to read SSH public key {path}: {message}")]
    Read {
        /// Path of the public key file.
        path: Utf8PathBuf,
        /// Description of the failure.
        message: String,
    },
}

/// Supplies the public key installed for root on new instances.
pub trait KeySource {
    /// Returns the public key in OpenSSH `authorized_keys` format.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the key cannot be produced or read.
    fn public_key(&self) -> Result<String, KeyError>;
}

/// Generate-or-load keypair at a fixed path.
#[derive(Clone, Debug)]
pub struct SshKeygen<R: CommandRunner = ProcessCommandRunner> {
    path: Utf8PathBuf,
    runner: R,
}

impl SshKeygen<ProcessCommandRunner> {
    /// Uses the system `ssh-keygen` for the private key at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self::with_runner(path, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> SshKeygen<R> {
    /// Uses `runner` to invoke `ssh-keygen`.
    #[must_use]
    pub fn with_runner(path: impl Into<Utf8PathBuf>, runner: R) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    fn public_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.pub", self.path))
    }

    fn open_parent(&self) -> Result<(Dir, String), KeyError> {
        let read_error = |message: String| KeyError::Read {
            path: self.public_path(),
            message,
        };
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| read_error(String::from("key path has no file name")))?
            .to_owned();
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_str().is_empty() => dir,
            _ => Utf8Path::new("."),
        };
        Dir::create_ambient_dir_all(parent, ambient_authority())
            .map_err(|err| read_error(err.to_string()))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|err| read_error(err.to_string()))?;
        Ok((dir, file_name))
    }

    fn generate(&self) -> Result<(), KeyError> {
        info!(path = %self.path, "generating SSH key");
        let args = [
            OsString::from("-q"),
            OsString::from("-t"),
            OsString::from("ed25519"),
            OsString::from("-N"),
            OsString::new(),
            OsString::from("-f"),
            OsString::from(self.path.as_str()),
        ];
        let output = self.runner.run("ssh-keygen", &args)?;
        if output.is_success() {
            return Ok(());
        }
        Err(KeyError::Generate {
            message: format!(
                "ssh-keygen exited with {}: {}",
                output
                    .code
                    .map_or_else(|| String::from("no status"), |code| code.to_string()),
                output.stderr.trim()
            ),
        })
    }
}

impl<R: CommandRunner> KeySource for SshKeygen<R> {
    fn public_key(&self) -> Result<String, KeyError> {
        let (dir, file_name) = self.open_parent()?;
        if !dir.exists(&file_name) {
            self.generate()?;
        }
        let contents = dir
            .read_to_string(format!("{file_name}.pub"))
            .map_err(|err| KeyError::Read {
                path: self.public_path(),
                message: err.to_string(),
            })?;
        let key = contents.trim();
        if key.is_empty() {
            return Err(KeyError::Read {
                path: self.public_path(),
                message: String::from("file is empty"),
            });
        }
        Ok(key.to_owned())
    }
}
