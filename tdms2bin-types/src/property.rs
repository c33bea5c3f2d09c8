use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};

use crate::{ModelError, ModelResult};

/// Форматы строковых меток времени, которые встречаются в TDMS файлах:
/// календарная дата и порядковый день года (`2024-001T00:00:00.000000`).
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%jT%H:%M:%S%.f",
    "%Y-%j %H:%M:%S%.f",
];

/// Значение скалярного свойства объекта контейнера.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Метка времени в UTC
    Timestamp(NaiveDateTime),
}

impl PropertyValue {
    /// Имя типа для сообщений об ошибках.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::UInt(_) => "uint",
            PropertyValue::Float(_) => "float",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::String(_) => "string",
            PropertyValue::Timestamp(_) => "timestamp",
        }
    }

    /// Числовое значение (целые приводятся к f64).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::UInt(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// `true` для пустой (или состоящей из пробелов) строки.
    pub fn is_blank(&self) -> bool {
        matches!(self, PropertyValue::String(s) if s.trim().is_empty())
    }

    /// Метка времени: либо нативная, либо распознанная из строки.
    pub fn as_timestamp(&self) -> ModelResult<NaiveDateTime> {
        match self {
            PropertyValue::Timestamp(t) => Ok(*t),
            PropertyValue::String(s) => parse_timestamp(s),
            other => Err(ModelError::invalid_timestamp(format!(
                "<{}>",
                other.type_name()
            ))),
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::UInt(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::String(s) => write!(f, "{s}"),
            PropertyValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<NaiveDateTime> for PropertyValue {
    fn from(t: NaiveDateTime) -> Self {
        PropertyValue::Timestamp(t)
    }
}

/// Разбирает строковую метку времени.
///
/// Принимает календарную (`2024-01-01T00:00:00.000000`) и порядковую
/// (`2024-001T00:00:00.000000`) формы, а также RFC 3339 со смещением.
///
/// # Примеры
/// ```
/// use tdms2bin_types::parse_timestamp;
/// let a = parse_timestamp("2024-01-01T00:00:00.5").unwrap();
/// let b = parse_timestamp("2024-001T00:00:00.500000").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_timestamp(s: &str) -> ModelResult<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }

    let s = s.strip_suffix('Z').unwrap_or(s);

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ModelError::invalid_timestamp(s))
}

/// Набор именованных скалярных свойств объекта.
///
/// Каждый объект владеет собственной копией значений: запись в свойства
/// одного канала не влияет на другие.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    inner: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&PropertyValue> {
        self.inner.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    /// Устанавливает значение, возвращая предыдущее.
    pub fn insert<K: Into<String>, V: Into<PropertyValue>>(
        &mut self,
        key: K,
        value: V,
    ) -> Option<PropertyValue> {
        self.inner.insert(key.into(), value.into())
    }

    /// Устанавливает значение только если ключ отсутствует.
    /// Возвращает `true`, если значение было записано.
    pub fn insert_if_absent(
        &mut self,
        key: &str,
        value: &PropertyValue,
    ) -> bool {
        if self.inner.contains_key(key) {
            return false;
        }

        self.inner.insert(key.to_string(), value.clone());
        true
    }

    /// Числовое значение свойства.
    pub fn get_f64(
        &self,
        key: &str,
    ) -> ModelResult<f64> {
        let value = self
            .get(key)
            .ok_or_else(|| ModelError::missing_property(key))?;

        value.as_f64().ok_or_else(|| ModelError::PropertyType {
            key: key.to_string(),
            found: value.type_name(),
            expected: "number",
        })
    }

    /// Метка времени из свойства.
    pub fn get_timestamp(
        &self,
        key: &str,
    ) -> ModelResult<NaiveDateTime> {
        self.get(key)
            .ok_or_else(|| ModelError::missing_property(key))?
            .as_timestamp()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.inner.iter()
    }
}
