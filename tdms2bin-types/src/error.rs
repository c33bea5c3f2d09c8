use thiserror::Error;

/// Результат для операций над моделью контейнера
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Ошибки доступа к модели контейнера.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Свойство отсутствует
    #[error("Missing property: {0}")]
    MissingProperty(String),

    /// Свойство имеет неожиданный тип
    #[error("Property '{key}' has type {found}, expected {expected}")]
    PropertyType {
        key: String,
        found: &'static str,
        expected: &'static str,
    },

    /// Строка не распознана как метка времени
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// Канал содержит нечисловые данные
    #[error("Channel '{channel}' holds non-numeric data ({type_name})")]
    NonNumericData { channel: String, type_name: String },
}

impl ModelError {
    /// Удобные конструкторы
    pub fn missing_property<S: Into<String>>(s: S) -> Self {
        Self::MissingProperty(s.into())
    }

    pub fn invalid_timestamp<S: Into<String>>(s: S) -> Self {
        Self::InvalidTimestamp(s.into())
    }
}
