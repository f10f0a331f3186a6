//! GnuPG engine.

use super::{CryptoEngine, CryptoError, SigningIdentity};
use crate::config::ConnectionConfig;
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Runs `gpg` in batch mode against a keyring directory.
///
/// Passphrases go through stdin (`--passphrase-fd 0`) and plaintext
/// through a temporary file, so neither shows up in the process list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuPg {
    binary: PathBuf,
    homedir: Option<PathBuf>,
}

impl Default for GnuPg {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl GnuPg {
    /// Creates an engine using the default keyring.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            homedir: None,
        }
    }

    /// Uses the keyring in `dir`.
    #[must_use]
    pub fn homedir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(dir.into());
        self
    }

    /// Creates an engine from `gpg_binary` and the keyring directory.
    #[must_use]
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            binary: config.gpg_binary.clone(),
            homedir: config.keyring_dir(),
        }
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(dir) = &self.homedir {
            args.push("--homedir".into());
            args.push(dir.clone().into_os_string());
        }
        args.extend(["--batch", "--yes", "--no-tty"].map(OsString::from));
        args
    }

    fn list_keys_args(&self, recipient: &str) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend(["--list-keys", "--with-colons", recipient].map(OsString::from));
        args
    }

    fn signing_args(&self, signer: &SigningIdentity) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend(
            [
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
                "--local-user",
                signer.user_id.as_str(),
                "--output",
                "-",
            ]
            .map(OsString::from),
        );
        args
    }

    fn sign_args(&self, signer: &SigningIdentity, input: &Path) -> Vec<OsString> {
        let mut args = self.signing_args(signer);
        args.push("--clearsign".into());
        args.push(input.as_os_str().to_owned());
        args
    }

    fn sign_and_encrypt_args(
        &self,
        signer: &SigningIdentity,
        recipient: &str,
        input: &Path,
    ) -> Vec<OsString> {
        let mut args = self.signing_args(signer);
        args.extend(
            [
                "--trust-model",
                "always",
                "--armor",
                "--sign",
                "--encrypt",
                "--recipient",
                recipient,
            ]
            .map(OsString::from),
        );
        args.push(input.as_os_str().to_owned());
        args
    }

    async fn run(&self, args: Vec<OsString>, stdin: Option<&str>) -> Result<Output, CryptoError> {
        trace!(binary = %self.binary.display(), ?args, "spawning gpg");
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CryptoError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let line = format!("{input}\n");
            match pipe.write_all(line.as_bytes()).await {
                Ok(()) => {}
                // gpg may exit before reading; its status tells why
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("gpg closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
            drop(pipe);
        }

        Ok(child.wait_with_output().await?)
    }

    async fn run_checked(
        &self,
        operation: &'static str,
        args: Vec<OsString>,
        passphrase: &str,
    ) -> Result<String, CryptoError> {
        let output = self.run(args, Some(passphrase)).await?;
        if !output.status.success() {
            return Err(CryptoError::Engine {
                operation,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let text = String::from_utf8(output.stdout)
            .map_err(|e| CryptoError::InvalidOutput(e.to_string()))?;
        if text.is_empty() {
            return Err(CryptoError::InvalidOutput(format!("{operation} produced no output")));
        }
        debug!(operation, bytes = text.len(), "gpg finished");
        Ok(text)
    }
}

fn stage(text: &str) -> Result<NamedTempFile, CryptoError> {
    let mut file = tempfile::Builder::new().prefix("sealpost-").tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn has_public_key(listing: &[u8]) -> bool {
    String::from_utf8_lossy(listing)
        .lines()
        .any(|line| line.starts_with("pub:"))
}

impl CryptoEngine for GnuPg {
    async fn key_exists(&self, recipient: &str) -> Result<bool, CryptoError> {
        if recipient.trim().is_empty() {
            return Ok(false);
        }
        // gpg exits non-zero when nothing matches
        let output = self.run(self.list_keys_args(recipient), None).await?;
        let found = output.status.success() && has_public_key(&output.stdout);
        debug!(recipient, found, "public key lookup");
        Ok(found)
    }

    async fn sign(&self, text: &str, signer: &SigningIdentity) -> Result<String, CryptoError> {
        let input = stage(text)?;
        self.run_checked("sign", self.sign_args(signer, input.path()), &signer.passphrase)
            .await
    }

    async fn sign_and_encrypt(
        &self,
        text: &str,
        signer: &SigningIdentity,
        recipient: &str,
    ) -> Result<String, CryptoError> {
        let input = stage(text)?;
        self.run_checked(
            "sign+encrypt",
            self.sign_and_encrypt_args(signer, recipient, input.path()),
            &signer.passphrase,
        )
        .await
    }
}
