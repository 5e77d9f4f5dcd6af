use crate::ini::IniError;
use crate::setting::SettingError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors surfaced to callers and the console.
#[derive(Debug)]
pub enum AppError {
    Setting(SettingError),
    Ini(IniError),
    UnknownOperation(String),
    UnknownView(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Recycle {
        path: PathBuf,
        source: trash::Error,
    },
    Cli(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setting(err) => write!(f, "{err}"),
            Self::Ini(err) => write!(f, "{err}"),
            Self::UnknownOperation(name) => write!(f, "operation not found: {name}"),
            Self::UnknownView(name) => write!(f, "view not found: {name}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Recycle { path, source } => {
                write!(f, "failed to move {} to trash: {source}", path.display())
            }
            Self::Cli(message) => write!(f, "invalid command line: {message}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Setting(err) => Some(err),
            Self::Ini(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Recycle { source, .. } => Some(source),
            Self::UnknownOperation(_) | Self::UnknownView(_) | Self::Cli(_) => None,
        }
    }
}

impl From<SettingError> for AppError {
    fn from(value: SettingError) -> Self {
        Self::Setting(value)
    }
}

impl From<IniError> for AppError {
    fn from(value: IniError) -> Self {
        Self::Ini(value)
    }
}

impl From<clap::Error> for AppError {
    fn from(value: clap::Error) -> Self {
        Self::Cli(value.to_string())
    }
}
