use std::path::PathBuf;
use std::process::Stdio;

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use zeroize::Zeroizing;

use crate::config::EXPLORER_API_KEY_ENV;
use crate::error::{Error, Result};
use crate::project::{Project, ProjectType};

/// What the deployer hands to the explorer after a deployment
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub contract: String,
    pub address: Address,
    pub constructor_args: Vec<String>,
    /// ABI-encoded form of `constructor_args`
    pub encoded_args: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

/// Submits deployed source to a block explorer.
///
/// Transient failures (rate limits, explorer not yet indexing the contract)
/// come back as [`Error::Verification`].
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome>;
}

/// Output from running the toolchain's verify command
#[derive(Debug, Clone)]
struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Verifies through the project's own toolchain (`hardhat verify` or
/// `forge verify-contract`), passing the credential through the environment
pub struct ExplorerVerifier {
    project_type: ProjectType,
    project_root: PathBuf,
    network: String,
    chain_id: u64,
    api_key: Zeroizing<String>,
}

impl ExplorerVerifier {
    pub fn new(
        project: &Project,
        network: &str,
        chain_id: u64,
        api_key: Zeroizing<String>,
    ) -> Self {
        Self {
            project_type: project.project_type,
            project_root: project.root.clone(),
            network: network.to_string(),
            chain_id,
            api_key,
        }
    }

    fn command(&self, request: &VerificationRequest) -> Command {
        let mut cmd = match self.project_type {
            ProjectType::Hardhat => {
                let mut cmd = Command::new("npx");
                cmd.arg("hardhat")
                    .arg("verify")
                    .arg("--network")
                    .arg(&self.network)
                    .arg(request.address.to_string())
                    .args(&request.constructor_args);
                cmd
            }
            ProjectType::Foundry => {
                let mut cmd = Command::new("forge");
                cmd.arg("verify-contract")
                    .arg(request.address.to_string())
                    .arg(&request.contract)
                    .arg("--chain")
                    .arg(self.chain_id.to_string())
                    .arg("--watch");
                if !request.encoded_args.is_empty() {
                    cmd.arg("--constructor-args")
                        .arg(request.encoded_args.to_string());
                }
                cmd
            }
        };

        // Credential goes through the environment, never the command line
        cmd.env(EXPLORER_API_KEY_ENV, self.api_key.as_str())
            .current_dir(&self.project_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<CommandOutput> {
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Verification(format!("Failed to spawn verify command: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Verification("verify command has no stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Verification("verify command has no stderr".into()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut stdout_output = String::new();
        let mut stderr_output = String::new();
        let (mut stdout_done, mut stderr_done) = (false, false);

        // Read output concurrently
        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout_lines.next_line(), if !stdout_done => match line {
                    Ok(Some(l)) => {
                        tracing::debug!(target: "nftops::verify", "{}", l);
                        stdout_output.push_str(&l);
                        stdout_output.push('\n');
                    }
                    Ok(None) => stdout_done = true,
                    Err(e) => {
                        tracing::warn!("Error reading stdout: {}", e);
                        stdout_done = true;
                    }
                },
                line = stderr_lines.next_line(), if !stderr_done => match line {
                    Ok(Some(l)) => {
                        stderr_output.push_str(&l);
                        stderr_output.push('\n');
                    }
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        tracing::warn!("Error reading stderr: {}", e);
                        stderr_done = true;
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::Verification(format!("Failed to wait for verify command: {}", e)))?;

        Ok(CommandOutput {
            success: status.success(),
            stdout: stdout_output,
            stderr: stderr_output,
        })
    }
}

#[async_trait]
impl Verifier for ExplorerVerifier {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
        tracing::info!(contract = %request.contract, address = %request.address, "Verifying...");
        let output = self.run(self.command(request)).await?;
        classify(&output)
    }
}

fn classify(output: &CommandOutput) -> Result<VerificationOutcome> {
    let combined = format!("{}\n{}", output.stdout, output.stderr).to_lowercase();

    // Both toolchains exit non-zero when the source is already on the explorer
    if combined.contains("already verified") {
        return Ok(VerificationOutcome::AlreadyVerified);
    }

    if output.success {
        return Ok(VerificationOutcome::Verified);
    }

    let reason = output
        .stderr
        .lines()
        .rev()
        .chain(output.stdout.lines().rev())
        .find(|l| !l.trim().is_empty())
        .unwrap_or("verify command failed")
        .trim()
        .to_string();

    Err(Error::Verification(reason))
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Records every request; answers from a script, defaulting to `Verified`
    #[derive(Default)]
    pub struct RecordingVerifier {
        pub requests: Mutex<Vec<VerificationRequest>>,
        answers: Mutex<VecDeque<Result<VerificationOutcome>>>,
    }

    impl RecordingVerifier {
        pub fn answering(answers: impl IntoIterator<Item = Result<VerificationOutcome>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                answers: Mutex::new(answers.into_iter().collect()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Verifier for RecordingVerifier {
        async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
            self.requests.lock().unwrap().push(request.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(VerificationOutcome::Verified))
        }
    }
}
