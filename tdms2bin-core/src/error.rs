use std::path::PathBuf;

use tdms2bin_reader::TdmsError;
use tdms2bin_types::ModelError;
use thiserror::Error;

use crate::orchestrator::RunState;

/// Результат для операций конвертера
pub type ConvertResult<T> = std::result::Result<T, ConvertError>;

/// Ошибки конвертации.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// В контейнере нет обязательных групп
    #[error("Required group(s) {missing:?} not found, container has {found:?}")]
    MissingGroups {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// Нулевая, отрицательная или нечисловая частота дискретизации
    #[error("Invalid sample rate: {0} (must be finite and > 0)")]
    InvalidSampleRate(f64),

    /// Время окончания не представимо
    #[error("Time overflow: {0}")]
    TimeOverflow(String),

    /// Ошибка записи выходного файла
    #[error("Failed to write {path:?}: {error}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Некорректный выходной файл при чтении
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Нарушен порядок этапов конвертации
    #[error("Invalid state: expected {expected:?}, found {found:?}")]
    InvalidState { expected: RunState, found: RunState },

    /// Ошибка чтения исходного TDMS файла
    #[error("Source error: {0}")]
    Source(#[from] TdmsError),

    /// Ошибка доступа к модели контейнера
    #[error("{0}")]
    Model(#[from] ModelError),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Удобные конструкторы
    pub fn invalid_artifact<S: Into<String>>(s: S) -> Self {
        Self::InvalidArtifact(s.into())
    }
}

/// Причины, по которым коэффициенты масштабирования канала недоступны.
///
/// Никогда не прерывает конвертацию: вызывающая сторона подставляет
/// [`crate::ScalingCoefficients::IDENTITY`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScalingLookupError {
    #[error("scale group '{0}' not found")]
    MissingGroup(String),

    #[error("no coefficients for channel '{0}'")]
    MissingChannel(String),

    #[error("expected 2 coefficients for '{channel}', found {found}")]
    WrongArity { channel: String, found: usize },

    #[error("coefficients for '{channel}' are not numeric ({type_name})")]
    NonNumeric { channel: String, type_name: String },

    #[error("coefficients for '{channel}' are not finite")]
    NonFinite { channel: String },
}
