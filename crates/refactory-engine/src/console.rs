//! Line-based operator console on stdin.
//!
//! Each line is one command. Pause, resume, speed and stop act on the
//! shared [`OperatorState`] at once; everything that touches the world is
//! queued and applied by the run loop between ticks.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use refactory_core::operator::{OperatorCommand, OperatorState};

/// Console usage text.
pub const HELP: &str = "commands: pause | resume | toggle | speed <x> | select <script> | \
edit <script> <file> | add <name> <file> | reset | save | load | status | stop | help";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Pause the run loop.
    Pause,
    /// Resume the run loop.
    Resume,
    /// Flip pause.
    Toggle,
    /// Set the game speed.
    Speed(f64),
    /// Stop the run.
    Stop,
    /// Print usage.
    Help,
    /// Read a script file, then queue an edit or an add.
    ScriptFile {
        /// Script to edit, or name of the new script.
        script: String,
        /// Source file.
        path: PathBuf,
        /// Add a new script instead of editing.
        add: bool,
    },
    /// Queue a command for the run loop.
    Queue(OperatorCommand),
}

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    /// The line held no command.
    #[error("empty command")]
    Empty,
    /// The first word is not a command.
    #[error("unknown command {0:?}")]
    Unknown(String),
    /// A required argument is missing.
    #[error("{command} needs {argument}")]
    MissingArgument {
        /// The command.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },
    /// The speed is not a number.
    #[error("not a number: {0:?}")]
    BadNumber(String),
}

/// Parse one console line.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));
    let missing = |command, argument| ConsoleError::MissingArgument { command, argument };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(ConsoleError::Empty),
        "pause" => Ok(ConsoleCommand::Pause),
        "resume" => Ok(ConsoleCommand::Resume),
        "toggle" => Ok(ConsoleCommand::Toggle),
        "stop" | "quit" | "exit" => Ok(ConsoleCommand::Stop),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "reset" => Ok(ConsoleCommand::Queue(OperatorCommand::Reset)),
        "save" => Ok(ConsoleCommand::Queue(OperatorCommand::SaveSnapshot)),
        "load" => Ok(ConsoleCommand::Queue(OperatorCommand::LoadSnapshot)),
        "status" => Ok(ConsoleCommand::Queue(OperatorCommand::ReportStatus)),
        "speed" => {
            if rest.is_empty() {
                return Err(missing("speed", "a multiplier"));
            }
            rest.parse::<f64>()
                .ok()
                .map(ConsoleCommand::Speed)
                .ok_or_else(|| ConsoleError::BadNumber(rest.to_owned()))
        }
        "select" => {
            if rest.is_empty() {
                return Err(missing("select", "a script name"));
            }
            Ok(ConsoleCommand::Queue(OperatorCommand::SelectScript(
                rest.to_owned(),
            )))
        }
        "edit" | "add" => {
            let add = word.eq_ignore_ascii_case("add");
            let command = if add { "add" } else { "edit" };
            let (script, path) = rest
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| missing(command, "a script and a file"))?;
            Ok(ConsoleCommand::ScriptFile {
                script: script.trim().to_owned(),
                path: PathBuf::from(path),
                add,
            })
        }
        other => Err(ConsoleError::Unknown(other.to_owned())),
    }
}

/// Apply `command` to the operator state.
pub async fn dispatch(operator: &OperatorState, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Pause => operator.pause(),
        ConsoleCommand::Resume => operator.resume(),
        ConsoleCommand::Toggle => {
            let paused = operator.toggle_pause();
            info!(paused, "pause toggled");
        }
        ConsoleCommand::Speed(speed) => match operator.set_speed(speed) {
            Some(applied) => info!(speed = applied, "speed changed"),
            None => warn!(speed, "speed rejected"),
        },
        ConsoleCommand::Stop => operator.request_stop(),
        ConsoleCommand::Help => info!("{HELP}"),
        ConsoleCommand::ScriptFile { script, path, add } => {
            match tokio::fs::read_to_string(&path).await {
                Ok(source) => {
                    let command = if add {
                        OperatorCommand::AddScript {
                            name: script,
                            source,
                        }
                    } else {
                        OperatorCommand::EditScript { script, source }
                    };
                    operator.submit(command).await;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "script file unreadable"),
            }
        }
        ConsoleCommand::Queue(command) => operator.submit(command).await,
    }
}

/// Read commands from stdin until it closes or a stop is requested.
pub async fn run_console(operator: Arc<OperatorState>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Ok(command) => dispatch(&operator, command).await,
                Err(ConsoleError::Empty) => {}
                Err(e) => warn!(error = %e, "{HELP}"),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "console read failed");
                break;
            }
        }
        if operator.is_stop_requested() {
            break;
        }
    }
}
