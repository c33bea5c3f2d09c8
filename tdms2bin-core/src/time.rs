//! Временные метаданные: чтение из свойств контейнера и перенос в каналы.

use chrono::{DateTime, NaiveDateTime};
use log::Level;
use tdms2bin_types::{Channel, Container, PropertyValue};

use crate::{
    diagnostics::Diagnostics,
    error::{ConvertError, ConvertResult},
};

/// Свойства контейнера, которые читает конвертер.
pub const KEY_CONFIGURATION: &str = "Configuration";
pub const KEY_CHANNEL_ASSIGN: &str = "ChannelAssign";
pub const KEY_AUTHOR: &str = "Author";
pub const KEY_TIMESTAMP: &str = "TimeStamp";
pub const KEY_SAMPLE_CLOCK_RATE: &str = "Sample Clock Rate";

/// Свойства канала, которые записываются при переносе.
pub const WF_START_TIME: &str = "wf_start_time";
pub const SAMP_RATE: &str = "samp_rate";
pub const WF_START_OFFSET: &str = "wf_start_offset";
pub const WF_INCREMENT: &str = "wf_increment";

/// Метка времени, подставляемая при пустом `TimeStamp`.
pub const SENTINEL_TIMESTAMP: &str = "1970-01-01T00:00:00.000000";

/// Начало эпохи Unix, то есть [`SENTINEL_TIMESTAMP`].
pub fn sentinel_epoch() -> NaiveDateTime {
    DateTime::UNIX_EPOCH.naive_utc()
}

/// Проверяет частоту дискретизации до вычисления обратной величины.
pub fn validate_sample_rate(sample_rate: f64) -> ConvertResult<f64> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        Err(ConvertError::InvalidSampleRate(sample_rate))
    }
}

/// Временные параметры записи уровня контейнера.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeProperties {
    /// Время первой выборки
    pub start_time: NaiveDateTime,
    /// Частота дискретизации, Гц
    pub sample_rate: f64,
    /// Смещение начала (всегда 0)
    pub start_offset: f64,
    /// Интервал между выборками, с
    pub sample_increment: f64,
}

impl TimeProperties {
    pub fn new(
        start_time: NaiveDateTime,
        sample_rate: f64,
    ) -> ConvertResult<Self> {
        let sample_rate = validate_sample_rate(sample_rate)?;

        Ok(Self {
            start_time,
            sample_rate,
            start_offset: 0.0,
            sample_increment: 1.0 / sample_rate,
        })
    }

    /// Читает `TimeStamp` и `Sample Clock Rate` из свойств контейнера.
    ///
    /// Пустой или отсутствующий `TimeStamp` заменяется началом эпохи с
    /// предупреждением. Отсутствующая или неположительная частота является ошибкой.
    pub fn resolve(
        container: &Container,
        diag: &dyn Diagnostics,
    ) -> ConvertResult<Self> {
        let props = &container.properties;

        for key in [KEY_CONFIGURATION, KEY_CHANNEL_ASSIGN, KEY_AUTHOR] {
            match props.get(key) {
                Some(value) => diag.emit(Level::Debug, format_args!("{key}: {value}")),
                None => diag.emit(Level::Debug, format_args!("{key} not set")),
            }
        }

        let start_time = match props.get(KEY_TIMESTAMP) {
            Some(value) if !value.is_blank() => value.as_timestamp()?,
            _ => {
                diag.emit(
                    Level::Warn,
                    format_args!(
                        "{KEY_TIMESTAMP} not set in input file, using {SENTINEL_TIMESTAMP}"
                    ),
                );
                sentinel_epoch()
            }
        };

        let sample_rate = props.get_f64(KEY_SAMPLE_CLOCK_RATE)?;
        let time = Self::new(start_time, sample_rate)?;

        diag.emit(
            Level::Debug,
            format_args!(
                "{WF_START_TIME}: {}, {SAMP_RATE}: {}, {WF_START_OFFSET}: {}, {WF_INCREMENT}: {}",
                time.start_time, time.sample_rate, time.start_offset, time.sample_increment
            ),
        );

        Ok(time)
    }

    /// Пары ключ/значение в порядке переноса в каналы.
    pub fn as_properties(&self) -> [(&'static str, PropertyValue); 4] {
        [
            (WF_START_TIME, PropertyValue::Timestamp(self.start_time)),
            (SAMP_RATE, PropertyValue::Float(self.sample_rate)),
            (WF_START_OFFSET, PropertyValue::Float(self.start_offset)),
            (WF_INCREMENT, PropertyValue::Float(self.sample_increment)),
        ]
    }

    /// Копирует недостающие ключи в свойства каждого канала группы данных.
    ///
    /// Ключи, уже заданные в канале, не перезаписываются. Возвращает
    /// количество записанных значений.
    pub fn propagate(
        &self,
        container: &mut Container,
        data_group: &str,
        diag: &dyn Diagnostics,
    ) -> ConvertResult<usize> {
        let found: Vec<String> = container
            .group_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let group = container
            .group_mut(data_group)
            .ok_or_else(|| ConvertError::MissingGroups {
                missing: vec![data_group.to_string()],
                found,
            })?;

        diag.emit(
            Level::Debug,
            format_args!(
                "Found {} channels in group: {data_group}",
                group.channels.len()
            ),
        );

        let values = self.as_properties();
        let mut written = 0;

        for channel in &mut group.channels {
            for (key, value) in &values {
                if channel.properties.insert_if_absent(key, value) {
                    diag.emit(
                        Level::Debug,
                        format_args!("key:{key} NOT in {}, so setting it", channel.name),
                    );
                    written += 1;
                } else {
                    diag.emit(
                        Level::Debug,
                        format_args!("key:{key} exists in {}", channel.name),
                    );
                }
            }
        }

        Ok(written)
    }
}

/// Временные параметры одного канала.
///
/// Значения копируются из собственных свойств канала после переноса и
/// дальше не зависят от контейнера.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTiming {
    pub start_time: NaiveDateTime,
    pub sample_rate: f64,
}

impl ChannelTiming {
    pub fn from_channel(channel: &Channel) -> ConvertResult<Self> {
        let sample_rate = validate_sample_rate(channel.properties.get_f64(SAMP_RATE)?)?;
        let start_time = channel.properties.get_timestamp(WF_START_TIME)?;

        Ok(Self {
            start_time,
            sample_rate,
        })
    }
}
