use crate::{ModelError, ModelResult, Properties};

/// Данные канала.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    /// Числовые выборки (любой числовой тип источника приводится к f64)
    Numeric(Vec<f64>),
    /// Нечисловые данные (например, строки): сохраняются только тип и
    /// количество значений
    NonNumeric { type_name: String, count: u64 },
}

impl Default for ChannelData {
    fn default() -> Self {
        ChannelData::Numeric(Vec::new())
    }
}

/// Канал: имя, свойства и упорядоченная последовательность выборок.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub name: String,
    pub properties: Properties,
    pub data: ChannelData,
}

impl Channel {
    /// Создаёт пустой канал.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
            data: ChannelData::default(),
        }
    }

    /// Создаёт канал с числовыми выборками.
    pub fn with_samples<S: Into<String>>(
        name: S,
        samples: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            properties: Properties::new(),
            data: ChannelData::Numeric(samples),
        }
    }

    /// Числовые выборки канала.
    pub fn samples(&self) -> ModelResult<&[f64]> {
        match &self.data {
            ChannelData::Numeric(v) => Ok(v),
            ChannelData::NonNumeric { type_name, .. } => Err(ModelError::NonNumericData {
                channel: self.name.clone(),
                type_name: type_name.clone(),
            }),
        }
    }

    /// Количество значений в канале.
    pub fn len(&self) -> usize {
        match &self.data {
            ChannelData::Numeric(v) => v.len(),
            ChannelData::NonNumeric { count, .. } => *count as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
