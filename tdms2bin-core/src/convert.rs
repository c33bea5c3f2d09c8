use tdms2bin_types::Channel;

use crate::{
    error::ConvertResult,
    header::{HeaderRecord, HEADER_FIELDS},
    scaling::ScalingCoefficients,
};

/// Применяет коэффициенты к выборкам канала с сужением до f32.
///
/// Длина и порядок сохраняются. Канал с нечисловыми данными даёт ошибку.
pub fn scale_channel(
    channel: &Channel,
    coeffs: &ScalingCoefficients,
) -> ConvertResult<Vec<f32>> {
    let raw = channel.samples()?;

    Ok(raw.iter().map(|&x| coeffs.apply(x) as f32).collect())
}

/// Готовое содержимое выходного файла: заголовок и масштабированные данные.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelArtifact {
    pub channel: String,
    pub header: HeaderRecord,
    pub samples: Vec<f32>,
}

impl ChannelArtifact {
    pub fn new<S: Into<String>>(
        channel: S,
        header: HeaderRecord,
        samples: Vec<f32>,
    ) -> Self {
        Self {
            channel: channel.into(),
            header,
            samples,
        }
    }

    /// Количество значений f32 в файле (13 + n).
    pub fn value_count(&self) -> usize {
        HEADER_FIELDS + self.samples.len()
    }

    /// Размер файла в байтах.
    pub fn byte_len(&self) -> usize {
        self.value_count() * 4
    }

    /// Все значения в порядке записи: сначала заголовок.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.header
            .fields()
            .iter()
            .chain(self.samples.iter())
            .copied()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.values().collect()
    }
}
