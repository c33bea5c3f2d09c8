use thiserror::Error;

/// Результат для операций чтения TDMS
pub type TdmsResult<T> = std::result::Result<T, TdmsError>;

/// Ошибки чтения TDMS файла.
#[derive(Debug, Error)]
pub enum TdmsError {
    /// Неправильная метка сегмента
    #[error("Invalid segment tag: {0}")]
    InvalidTag(String),

    /// Несовместимая версия формата
    #[error("Unsupported TDMS version: {0}")]
    UnsupportedVersion(u32),

    /// Неподдерживаемый тип данных
    #[error("Unsupported data type: 0x{0:08x}")]
    UnsupportedDataType(u32),

    /// Свойство объекта имеет неизвестный тип, дальше метаданные не разобрать
    #[error("Property '{property}' of object {path} has unsupported data type 0x{code:08x}")]
    UnsupportedPropertyType {
        path: String,
        property: String,
        code: u32,
    },

    /// Сырые данные DAQmx не поддерживаются
    #[error("DAQmx raw data is not supported (object {0})")]
    DaqmxUnsupported(String),

    /// Некорректный путь объекта
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// Повреждённые или некорректные данные
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TdmsError {
    /// Удобные конструкторы
    pub fn invalid_tag<S: Into<String>>(s: S) -> Self {
        Self::InvalidTag(s.into())
    }

    pub fn invalid_path<S: Into<String>>(s: S) -> Self {
        Self::InvalidPath(s.into())
    }

    pub fn corrupted<S: Into<String>>(s: S) -> Self {
        Self::Corrupted(s.into())
    }
}
