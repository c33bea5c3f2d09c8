//! Бинарная структура TDMS файлов (версии 4712 и 4713).
//!
//! Файл состоит из сегментов. Каждый сегмент начинается с 28-байтового
//! lead-in (всегда little-endian), за которым следуют метаданные и сырые
//! данные. Порядок байт метаданных и данных задаётся флагом
//! [`TOC_BIG_ENDIAN`].

use chrono::{DateTime, NaiveDateTime};

use crate::error::{TdmsError, TdmsResult};

/// Метка сегмента данных: b"TDSm"
pub const TDMS_TAG: [u8; 4] = [b'T', b'D', b'S', b'm'];

/// Размер lead-in сегмента
pub const LEAD_IN_SIZE: usize = 28;

/// Поддерживаемые версии формата
pub const TDMS_VERSIONS: [u32; 2] = [4712, 4713];

/// Сегмент содержит метаданные
pub const TOC_META_DATA: u32 = 1 << 1;
/// Сегмент задаёт новый список объектов
pub const TOC_NEW_OBJ_LIST: u32 = 1 << 2;
/// Сегмент содержит сырые данные
pub const TOC_RAW_DATA: u32 = 1 << 3;
/// Сырые данные чередуются по каналам
pub const TOC_INTERLEAVED_DATA: u32 = 1 << 5;
/// Метаданные и данные в порядке big-endian
pub const TOC_BIG_ENDIAN: u32 = 1 << 6;
/// Сегмент содержит сырые данные DAQmx
pub const TOC_DAQMX_RAW_DATA: u32 = 1 << 7;

/// Индекс сырых данных: у объекта нет данных в сегменте
pub const RAW_INDEX_NONE: u32 = 0xFFFF_FFFF;
/// Индекс сырых данных: такой же, как в предыдущем сегменте
pub const RAW_INDEX_SAME: u32 = 0x0000_0000;
/// Индексы DAQmx (format changing / digital line scaler)
pub const RAW_INDEX_DAQMX: [u32; 2] = [0x6912_0000, 0x6913_0000];

/// next_segment_offset незавершённого сегмента
pub const INCOMPLETE_SEGMENT: u64 = u64::MAX;

/// Секунды между эпохой LabVIEW (1904-01-01 UTC) и эпохой Unix
pub const LABVIEW_EPOCH_OFFSET_SECS: i64 = 2_082_844_800;

/// Lead-in сегмента
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadIn {
    /// Маска содержимого (флаги `TOC_*`)
    pub toc: u32,
    /// Версия формата
    pub version: u32,
    /// Смещение следующего сегмента от конца lead-in
    pub next_segment_offset: u64,
    /// Смещение сырых данных от конца lead-in (= длина метаданных)
    pub raw_data_offset: u64,
}

impl LeadIn {
    /// Сериализация lead-in в 28 байт
    pub fn serialize(&self) -> [u8; LEAD_IN_SIZE] {
        let mut buf = [0u8; LEAD_IN_SIZE];

        buf[0..4].copy_from_slice(&TDMS_TAG);
        buf[4..8].copy_from_slice(&self.toc.to_le_bytes());
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..20].copy_from_slice(&self.next_segment_offset.to_le_bytes());
        buf[20..28].copy_from_slice(&self.raw_data_offset.to_le_bytes());

        buf
    }

    /// Десериализация lead-in из 28 байт
    pub fn deserialize(buf: &[u8; LEAD_IN_SIZE]) -> TdmsResult<Self> {
        if buf[0..4] != TDMS_TAG {
            return Err(TdmsError::invalid_tag(
                String::from_utf8_lossy(&buf[0..4]).into_owned(),
            ));
        }

        let toc = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let version = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);

        if !TDMS_VERSIONS.contains(&version) {
            return Err(TdmsError::UnsupportedVersion(version));
        }

        let mut off8 = [0u8; 8];
        off8.copy_from_slice(&buf[12..20]);
        let next_segment_offset = u64::from_le_bytes(off8);
        off8.copy_from_slice(&buf[20..28]);
        let raw_data_offset = u64::from_le_bytes(off8);

        Ok(LeadIn {
            toc,
            version,
            next_segment_offset,
            raw_data_offset,
        })
    }

    pub fn has(
        &self,
        flag: u32,
    ) -> bool {
        self.toc & flag != 0
    }

    pub fn is_little_endian(&self) -> bool {
        !self.has(TOC_BIG_ENDIAN)
    }
}

/// Тип данных TDMS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DataType {
    Void = 0x00,
    I8 = 0x01,
    I16 = 0x02,
    I32 = 0x03,
    I64 = 0x04,
    U8 = 0x05,
    U16 = 0x06,
    U32 = 0x07,
    U64 = 0x08,
    F32 = 0x09,
    F64 = 0x0A,
    /// f32 с единицей измерения
    F32Unit = 0x19,
    /// f64 с единицей измерения
    F64Unit = 0x1A,
    String = 0x20,
    Bool = 0x21,
    /// 16 байт: доли секунды (2^-64) + секунды с 1904-01-01
    Timestamp = 0x44,
}

impl DataType {
    pub fn from_u32(v: u32) -> TdmsResult<Self> {
        let dt = match v {
            0x00 => DataType::Void,
            0x01 => DataType::I8,
            0x02 => DataType::I16,
            0x03 => DataType::I32,
            0x04 => DataType::I64,
            0x05 => DataType::U8,
            0x06 => DataType::U16,
            0x07 => DataType::U32,
            0x08 => DataType::U64,
            0x09 => DataType::F32,
            0x0A => DataType::F64,
            0x19 => DataType::F32Unit,
            0x1A => DataType::F64Unit,
            0x20 => DataType::String,
            0x21 => DataType::Bool,
            0x44 => DataType::Timestamp,
            _ => return Err(TdmsError::UnsupportedDataType(v)),
        };

        Ok(dt)
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Размер одного значения в байтах (`None` для строк).
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            DataType::Void => Some(0),
            DataType::I8 | DataType::U8 | DataType::Bool => Some(1),
            DataType::I16 | DataType::U16 => Some(2),
            DataType::I32 | DataType::U32 | DataType::F32 | DataType::F32Unit => Some(4),
            DataType::I64 | DataType::U64 | DataType::F64 | DataType::F64Unit => Some(8),
            DataType::Timestamp => Some(16),
            DataType::String => None,
        }
    }

    /// Данные этого типа представимы выборками f64.
    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            DataType::Void | DataType::String | DataType::Timestamp
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Void => "void",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::F32 | DataType::F32Unit => "f32",
            DataType::F64 | DataType::F64Unit => "f64",
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Timestamp => "timestamp",
        }
    }
}

/// Путь объекта: `/`, `/'group'` или `/'group'/'channel'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectPath {
    Root,
    Group(String),
    Channel { group: String, channel: String },
}

impl ObjectPath {
    /// Разбирает путь. Одинарная кавычка внутри имени экранируется удвоением.
    pub fn parse(path: &str) -> TdmsResult<Self> {
        if path == "/" {
            return Ok(ObjectPath::Root);
        }

        let mut parts: Vec<String> = Vec::new();
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '/' || chars.next() != Some('\'') {
                return Err(TdmsError::invalid_path(path));
            }

            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        name.push('\'');
                    }
                    Some('\'') => break,
                    Some(ch) => name.push(ch),
                    None => return Err(TdmsError::invalid_path(path)),
                }
            }
            parts.push(name);
        }

        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), None, None) => Ok(ObjectPath::Group(group)),
            (Some(group), Some(channel), None) => Ok(ObjectPath::Channel { group, channel }),
            _ => Err(TdmsError::invalid_path(path)),
        }
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let esc = |s: &str| s.replace('\'', "''");
        match self {
            ObjectPath::Root => write!(f, "/"),
            ObjectPath::Group(g) => write!(f, "/'{}'", esc(g)),
            ObjectPath::Channel { group, channel } => {
                write!(f, "/'{}'/'{}'", esc(group), esc(channel))
            }
        }
    }
}

/// Преобразует метку времени LabVIEW (секунды с 1904 + доли 2^-64) в UTC.
pub fn labview_timestamp(
    seconds: i64,
    fractions: u64,
) -> TdmsResult<NaiveDateTime> {
    let unix_secs = seconds
        .checked_sub(LABVIEW_EPOCH_OFFSET_SECS)
        .ok_or_else(|| TdmsError::corrupted("Timestamp out of range"))?;
    let nanos = ((fractions as u128 * 1_000_000_000) >> 64) as u32;

    DateTime::from_timestamp(unix_secs, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| TdmsError::corrupted(format!("Timestamp out of range: {seconds}s")))
}
