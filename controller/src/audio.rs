use std::io::Write;

use async_trait::async_trait;
use tokio::process::Command;

/// A one-shot alert sound.
#[async_trait]
pub trait AudioCue: Send + Sync {
    async fn play(&self) -> Result<(), CueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CueError {
    #[error("failed to run player {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("player {0} exited with {1}")]
    Exit(String, std::process::ExitStatus),
    #[error("failed to ring terminal bell: {0}")]
    Bell(std::io::Error),
}

/// Plays the cue by running an external player, e.g. `paplay alert.wav`.
pub struct CommandCue {
    program: String,
    args: Vec<String>,
}

impl CommandCue {
    /// Returns `None` for an empty command line.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl AudioCue for CommandCue {
    async fn play(&self) -> Result<(), CueError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| CueError::Spawn(self.program.clone(), e))?;
        if !status.success() {
            return Err(CueError::Exit(self.program.clone(), status));
        }
        Ok(())
    }
}

/// Rings the terminal bell on stderr.
pub struct BellCue;

#[async_trait]
impl AudioCue for BellCue {
    async fn play(&self) -> Result<(), CueError> {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(b"\x07").map_err(CueError::Bell)?;
        stderr.flush().map_err(CueError::Bell)
    }
}
