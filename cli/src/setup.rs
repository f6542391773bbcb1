//! First-run setup wizard
//!
//! Finds the save file, lists its characters, and asks which slot to track
//! and where to publish the count. The answers are written to `config.json`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use deathwatch_core::config::{AppConfigExt, ConfigError};
use deathwatch_core::locator::{LocateError, SAVE_FILE_NAME, resolve_save_path};
use deathwatch_core::save::{Profile, read_save_file};
use deathwatch_types::AppConfig;
use deathwatch_types::config::DEFAULT_WEB_PORT;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("setup aborted: input closed")]
    Aborted,

    #[error("file not found: {0}")]
    SaveNotFound(PathBuf),

    #[error("error reading save file {path:?}: {source}")]
    ReadSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no active characters found in save file")]
    NoCharacters,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Run the wizard on the terminal. Returns `None` if setup did not complete.
pub fn run_setup_wizard(config_path: &Path) -> Option<AppConfig> {
    let stdin = io::stdin();
    let mut wizard = Wizard::new(stdin.lock(), io::stdout());

    match wizard.run(config_path, resolve_save_path(None)) {
        Ok(config) => Some(config),
        Err(e) => {
            error!(error = %e, "Setup did not complete");
            None
        }
    }
}

pub struct Wizard<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Wizard<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Walk through setup and write the resulting config to `config_path`.
    ///
    /// `detected` is the result of probing the default save location.
    pub fn run(
        &mut self,
        config_path: &Path,
        detected: Result<PathBuf, LocateError>,
    ) -> Result<AppConfig, SetupError> {
        writeln!(self.output, "deathwatch - Setup Wizard")?;

        let save_path = match detected {
            Ok(path) => path,
            Err(e) => {
                writeln!(self.output, "Could not auto-detect save file: {e}")?;
                let entered = self.prompt(&format!("Enter full path to {SAVE_FILE_NAME}: "))?;
                let path = PathBuf::from(entered);
                if !path.exists() {
                    return Err(SetupError::SaveNotFound(path));
                }
                path
            }
        };
        writeln!(self.output, "\nFound save file at: {}", save_path.display())?;

        let profiles = read_save_file(&save_path).map_err(|source| SetupError::ReadSave {
            path: save_path.clone(),
            source,
        })?;
        if profiles.is_empty() {
            return Err(SetupError::NoCharacters);
        }

        writeln!(self.output, "\nFound characters:")?;
        for profile in &profiles {
            writeln!(
                self.output,
                "Slot {}: {} (Level {})",
                profile.slot_index, profile.name, profile.level
            )?;
        }

        let character_slot = self.prompt_slot(&profiles)?;

        let answer = self.prompt("\nEnable web overlay (Y/n): ")?;
        let enable_web_ui = !answer.eq_ignore_ascii_case("n");
        if !enable_web_ui {
            writeln!(
                self.output,
                "Web overlay disabled. Text file output will be enabled."
            )?;
        }

        let web_port = if enable_web_ui {
            self.prompt_port()?
        } else {
            DEFAULT_WEB_PORT
        };

        let config = AppConfig {
            character_slot,
            enable_web_ui,
            enable_text_file: !enable_web_ui,
            web_port,
            save_path: Some(save_path.to_string_lossy().into_owned()),
        };
        config.save(config_path)?;

        writeln!(self.output, "\nConfiguration saved to: {}", config_path.display())?;
        writeln!(self.output, "Save path: {}", save_path.display())?;
        writeln!(self.output, "Setup complete!")?;
        Ok(config)
    }

    fn prompt_slot(&mut self, profiles: &[Profile]) -> Result<usize, SetupError> {
        loop {
            let input = self.prompt("\nEnter character slot number: ")?;
            let Ok(slot) = input.parse::<usize>() else {
                writeln!(self.output, "Invalid input. Please enter a number.")?;
                continue;
            };

            if profiles.iter().any(|p| p.slot_index == slot) {
                return Ok(slot);
            }
            writeln!(
                self.output,
                "Slot {slot} not found. Please choose from the list above."
            )?;
        }
    }

    fn prompt_port(&mut self) -> Result<u16, SetupError> {
        let input = self.prompt(&format!("Web server port (default {DEFAULT_WEB_PORT}): "))?;
        if input.is_empty() {
            return Ok(DEFAULT_WEB_PORT);
        }

        match input.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => {
                writeln!(self.output, "Invalid port, using {DEFAULT_WEB_PORT}.")?;
                Ok(DEFAULT_WEB_PORT)
            }
        }
    }

    /// Print `prompt` and read one trimmed line. End of input aborts setup.
    fn prompt(&mut self, prompt: &str) -> Result<String, SetupError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SetupError::Aborted);
        }
        Ok(line.trim().to_string())
    }
}
