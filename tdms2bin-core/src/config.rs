use std::path::PathBuf;

/// Группа с сырыми данными по умолчанию
pub const DEFAULT_DATA_GROUP: &str = "Unscaled Data";

/// Группа с коэффициентами масштабирования по умолчанию
pub const DEFAULT_SCALE_GROUP: &str = "Scaling Coefficients";

/// Полная конфигурация конвертации.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    /// Путь к исходному .tdms файлу
    pub source_path: PathBuf,
    /// Корень имён выходных .bin файлов (None = имя исходного файла без
    /// расширения)
    pub out_root: Option<PathBuf>,
    /// Имя группы с сырыми данными
    pub data_group: String,
    /// Имя группы с коэффициентами масштабирования
    pub scale_group: String,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ConverterConfig {
    /// Конфигурация с группами по умолчанию для заданного файла.
    pub fn new<P: Into<PathBuf>>(source_path: P) -> Self {
        Self {
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    /// Корень имён выходных файлов.
    ///
    /// # Примеры
    /// ```
    /// use std::path::PathBuf;
    /// use tdms2bin_core::ConverterConfig;
    ///
    /// let cfg = ConverterConfig::new("data/run_001.tdms");
    /// assert_eq!(cfg.out_root(), PathBuf::from("data/run_001"));
    /// ```
    pub fn out_root(&self) -> PathBuf {
        self.out_root
            .clone()
            .unwrap_or_else(|| self.source_path.with_extension(""))
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ConverterConfig
////////////////////////////////////////////////////////////////////////////////

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("input.tdms"),
            out_root: None,
            data_group: DEFAULT_DATA_GROUP.to_string(),
            scale_group: DEFAULT_SCALE_GROUP.to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_root_defaults_to_source_stem() {
        let cfg = ConverterConfig::new("/data/shot.2024.tdms");
        assert_eq!(cfg.out_root(), PathBuf::from("/data/shot.2024"));

        let cfg = ConverterConfig::new("plain");
        assert_eq!(cfg.out_root(), PathBuf::from("plain"));
    }

    #[test]
    fn test_out_root_override() {
        let cfg = ConverterConfig {
            out_root: Some(PathBuf::from("/tmp/out")),
            ..ConverterConfig::new("in.tdms")
        };

        assert_eq!(cfg.out_root(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_default_groups() {
        let cfg = ConverterConfig::default();

        assert_eq!(cfg.data_group, "Unscaled Data");
        assert_eq!(cfg.scale_group, "Scaling Coefficients");
    }
}
