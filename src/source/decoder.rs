//! External decoder process
//!
//! Launches the decoder (librespot by default) with its PCM output on stdout.
//! The process is not supervised: if it exits, the source sees EOF.

use std::ffi::OsString;
use std::process::Stdio;

use tokio::process::{Child, ChildStdout, Command};

use crate::error::{Error, Result};

/// Decoder command line options
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Executable to run
    pub program: OsString,
    /// Name the decoder advertises itself under
    pub device_name: String,
    /// Upstream bitrate in kbit/s
    pub bitrate: u32,
    /// Initial volume, 0-100
    pub initial_volume: u8,
    /// Appended verbatim after the generated arguments
    pub extra_args: Vec<OsString>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: "librespot".into(),
            device_name: "wavcast".into(),
            bitrate: 160,
            initial_volume: 50,
            extra_args: Vec::new(),
        }
    }
}

impl DecoderConfig {
    /// Set the executable
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the advertised device name
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Set the bitrate
    pub fn bitrate(mut self, kbps: u32) -> Self {
        self.bitrate = kbps;
        self
    }

    /// Set the initial volume, capped at 100
    pub fn initial_volume(mut self, volume: u8) -> Self {
        self.initial_volume = volume.min(100);
        self
    }

    /// Add an extra argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Arguments passed to the decoder
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--disable-audio-cache".into(),
            "-n".into(),
            self.device_name.clone().into(),
            "-b".into(),
            self.bitrate.to_string().into(),
            "--initial-volume".into(),
            self.initial_volume.to_string().into(),
            "--backend".into(),
            "pipe".into(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Build the command without spawning it
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }

    /// Spawn the decoder
    pub fn spawn(&self) -> Result<DecoderProcess> {
        let mut child = self.command().spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "decoder stdout was not captured",
            ))
        })?;

        tracing::info!(
            program = ?self.program,
            device_name = %self.device_name,
            bitrate = self.bitrate,
            pid = child.id(),
            "Decoder started"
        );

        Ok(DecoderProcess {
            child,
            stdout: Some(stdout),
        })
    }
}

/// A running decoder
pub struct DecoderProcess {
    child: Child,
    stdout: Option<ChildStdout>,
}

impl DecoderProcess {
    /// Take the PCM output pipe; `None` after the first call
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Kill the decoder and reap it
    pub async fn kill(&mut self) -> Result<()> {
        match self.child.kill().await {
            Ok(()) => Ok(()),
            // Already exited
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
