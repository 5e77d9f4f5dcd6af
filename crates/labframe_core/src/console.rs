//! Line-oriented scripting console over a running app.
//!
//! # Responsibility
//! - Parse one command line and execute it against a [`ConsoleHost`].
//! - Keep the history of executed lines.

use crate::access::SettingAccess;
use crate::app::{AppError, AppResult, BaseApp};
use crate::browser::{DataBrowser, RECYCLE_OPERATION};
use crate::ini::IniError;
use crate::setting::SettingError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const HELP_TEXT: &str = "\
commands:
  help                      show this text
  paths                     list registered setting paths
  get <path>                print a setting value
  set <path> <value>        write a setting (ignores protection)
  set-safe <path> <value>   write a setting unless protected
  protect <path>            mark a setting protected
  unprotect <path>          clear the protected flag
  proposals <path>          list proposed values of a setting
  ops                       list operations
  run <operation>           run an operation
  recycle                   move the selected file to the trash
  save <file>               save all settings to an INI file
  load <file>               load settings from an INI file";

/// App surface the console drives.
pub trait ConsoleHost: SettingAccess + Sized {
    fn app_name(&self) -> &str;
    fn operation_names(&self) -> Vec<String>;
    fn run_operation(&mut self, name: &str) -> AppResult<()>;

    /// Moves the selected data file to the trash. Hosts without a file
    /// selection report the operation as unknown.
    fn recycle_data_file(&mut self) -> AppResult<PathBuf> {
        Err(AppError::UnknownOperation(RECYCLE_OPERATION.to_string()))
    }
}

impl ConsoleHost for BaseApp {
    fn app_name(&self) -> &str {
        self.name()
    }

    fn operation_names(&self) -> Vec<String> {
        self.operations().names()
    }

    fn run_operation(&mut self, name: &str) -> AppResult<()> {
        BaseApp::run_operation(self, name)
    }
}

impl ConsoleHost for DataBrowser {
    fn app_name(&self) -> &str {
        self.app().name()
    }

    fn operation_names(&self) -> Vec<String> {
        self.app().operations().names()
    }

    fn run_operation(&mut self, name: &str) -> AppResult<()> {
        DataBrowser::run_operation(self, name)
    }

    fn recycle_data_file(&mut self) -> AppResult<PathBuf> {
        DataBrowser::recycle_data_file(self)
    }
}

/// Console command failures.
#[derive(Debug)]
pub enum ConsoleError {
    UnknownCommand(String),
    Usage(&'static str),
    PathMissing(String),
    App(AppError),
}

impl Display for ConsoleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand(command) => {
                write!(f, "unknown command `{command}`; try `help`")
            }
            Self::Usage(usage) => write!(f, "usage: {usage}"),
            Self::PathMissing(path) => write!(f, "no setting at `{path}`"),
            Self::App(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConsoleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::App(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AppError> for ConsoleError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<SettingError> for ConsoleError {
    fn from(value: SettingError) -> Self {
        Self::App(AppError::Setting(value))
    }
}

impl From<IniError> for ConsoleError {
    fn from(value: IniError) -> Self {
        Self::App(AppError::Ini(value))
    }
}

/// Interactive console state.
#[derive(Debug, Default)]
pub struct Console {
    history: Vec<String>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executed non-empty lines, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn banner<H: ConsoleHost>(host: &H) -> String {
        format!("{} console. Type `help` for commands.", host.app_name())
    }

    /// Executes one line and returns its textual reply.
    pub fn execute<H: ConsoleHost>(
        &mut self,
        host: &mut H,
        line: &str,
    ) -> Result<String, ConsoleError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(String::new());
        }
        self.history.push(line.to_string());

        let (command, rest) = split_word(line);
        match command {
            "help" => Ok(HELP_TEXT.to_string()),
            "paths" => Ok(host.setting_paths().join("\n")),
            "get" => {
                let path = single_arg(rest, "get <path>")?;
                host.read_setting_ini(path)
                    .map(|value| format!("{path} = {value}"))
                    .ok_or_else(|| ConsoleError::PathMissing(path.to_string()))
            }
            "set" | "set-safe" => {
                let usage = if command == "set" {
                    "set <path> <value>"
                } else {
                    "set-safe <path> <value>"
                };
                let (path, value) = split_word(rest);
                if path.is_empty() {
                    return Err(ConsoleError::Usage(usage));
                }
                let result = if command == "set" {
                    host.write_setting(path, value)?
                } else {
                    host.write_setting_safe(path, value)?
                };
                Ok(format!("{path}: {result}"))
            }
            "protect" | "unprotect" => {
                let usage = if command == "protect" {
                    "protect <path>"
                } else {
                    "unprotect <path>"
                };
                let path = single_arg(rest, usage)?;
                let setting = host
                    .lookup_setting(path)
                    .ok_or_else(|| ConsoleError::PathMissing(path.to_string()))?;
                setting.set_protected(command == "protect");
                Ok(format!("{path}: protected={}", setting.is_protected()))
            }
            "proposals" => {
                let path = single_arg(rest, "proposals <path>")?;
                let setting = host
                    .lookup_setting(path)
                    .ok_or_else(|| ConsoleError::PathMissing(path.to_string()))?;
                Ok(setting
                    .proposed_values()
                    .into_iter()
                    .map(|(label, value)| format!("{label}: {value}"))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "ops" => Ok(host.operation_names().join("\n")),
            "run" => {
                let name = single_arg(rest, "run <operation>")?;
                host.run_operation(name)?;
                Ok(format!("ran {name}"))
            }
            "recycle" => {
                let path = host.recycle_data_file()?;
                Ok(format!("recycled {}", path.display()))
            }
            "save" => {
                let file = rest_arg(rest, "save <file>")?;
                let values = host.settings_save_ini(Path::new(file))?;
                Ok(format!("saved {} settings to {file}", values.len()))
            }
            "load" => {
                let file = rest_arg(rest, "load <file>")?;
                let report = host.settings_load_ini(Path::new(file))?;
                Ok(format!(
                    "applied {} of {} settings from {file}",
                    report.applied().len(),
                    report.values.len()
                ))
            }
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn single_arg<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, ConsoleError> {
    let arg = rest.trim();
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        Err(ConsoleError::Usage(usage))
    } else {
        Ok(arg)
    }
}

/// The rest of the line as one argument, so file names may hold spaces.
fn rest_arg<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, ConsoleError> {
    let arg = rest.trim();
    if arg.is_empty() {
        Err(ConsoleError::Usage(usage))
    } else {
        Ok(arg)
    }
}
