use thiserror::Error;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Ошибка записи файла сводки
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации сводки
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
