//! Заголовок выходного файла: 13 значений f32.
//!
//! Порядок полей:
//! `[rate, y0, mo0, d0, h0, mi0, s0, y1, mo1, d1, h1, mi1, s1]`, где `s`
//! кодируется как `секунды + микросекунды / 100000`.

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike};

use crate::error::{ConvertError, ConvertResult};

/// Количество полей заголовка
pub const HEADER_FIELDS: usize = 13;

/// Размер заголовка в байтах
pub const HEADER_SIZE: usize = HEADER_FIELDS * 4;

/// Делитель микросекунд в поле секунд
pub const SECONDS_FRACTION_DIVISOR: f64 = 100_000.0;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Заголовок одного выходного файла.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderRecord([f32; HEADER_FIELDS]);

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl HeaderRecord {
    /// Строит заголовок по частоте, времени начала и числу выборок.
    ///
    /// Время окончания = начало + (n − 1) / rate, округлённое до
    /// микросекунды. Для пустого канала окончание совпадает с началом.
    ///
    /// # Примеры
    /// ```
    /// use chrono::NaiveDate;
    /// use tdms2bin_core::HeaderRecord;
    ///
    /// let start = NaiveDate::from_ymd_opt(2024, 1, 1)
    ///     .unwrap()
    ///     .and_hms_opt(0, 0, 0)
    ///     .unwrap();
    /// let header = HeaderRecord::build(1.0, start, 3).unwrap();
    ///
    /// assert_eq!(header.end_fields(), [2024.0, 1.0, 1.0, 0.0, 0.0, 2.0]);
    /// ```
    pub fn build(
        sample_rate: f64,
        start_time: NaiveDateTime,
        sample_count: usize,
    ) -> ConvertResult<Self> {
        let end_time = end_time(sample_rate, start_time, sample_count)?;

        let mut fields = [0f32; HEADER_FIELDS];
        fields[0] = sample_rate as f32;
        fields[1..7].copy_from_slice(&calendar_fields(&start_time));
        fields[7..13].copy_from_slice(&calendar_fields(&end_time));

        Ok(Self(fields))
    }

    pub fn from_fields(fields: [f32; HEADER_FIELDS]) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[f32; HEADER_FIELDS] {
        &self.0
    }

    pub fn sample_rate(&self) -> f32 {
        self.0[0]
    }

    /// Год, месяц, день, час, минута, секунды начала.
    pub fn start_fields(&self) -> [f32; 6] {
        let mut out = [0f32; 6];
        out.copy_from_slice(&self.0[1..7]);
        out
    }

    /// Год, месяц, день, час, минута, секунды окончания.
    pub fn end_fields(&self) -> [f32; 6] {
        let mut out = [0f32; 6];
        out.copy_from_slice(&self.0[7..13]);
        out
    }
}

/// Время последней выборки.
pub fn end_time(
    sample_rate: f64,
    start_time: NaiveDateTime,
    sample_count: usize,
) -> ConvertResult<NaiveDateTime> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(ConvertError::InvalidSampleRate(sample_rate));
    }

    let span_us = (sample_count.saturating_sub(1) as f64 / sample_rate * MICROS_PER_SEC)
        .round_ties_even();

    if !span_us.is_finite() || span_us >= i64::MAX as f64 {
        return Err(ConvertError::TimeOverflow(format!(
            "{sample_count} samples at {sample_rate} Hz"
        )));
    }

    start_time
        .checked_add_signed(TimeDelta::microseconds(span_us as i64))
        .ok_or_else(|| {
            ConvertError::TimeOverflow(format!("{start_time} + {span_us} us"))
        })
}

/// Календарные поля метки времени в формате заголовка.
pub fn calendar_fields(t: &NaiveDateTime) -> [f32; 6] {
    let micros = t.nanosecond() / 1_000;
    let seconds = t.second() as f64 + micros as f64 / SECONDS_FRACTION_DIVISOR;

    [
        t.year() as f32,
        t.month() as f32,
        t.day() as f32,
        t.hour() as f32,
        t.minute() as f32,
        seconds as f32,
    ]
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(
        h: u32,
        m: u32,
        s: u32,
        us: u32,
    ) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(h, m, s, us)
            .unwrap()
    }

    #[test]
    fn test_three_samples_at_one_hz() {
        let h = HeaderRecord::build(1.0, at(0, 0, 0, 0), 3).unwrap();

        assert_eq!(h.sample_rate(), 1.0);
        assert_eq!(h.start_fields(), [2024.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(h.end_fields(), [2024.0, 1.0, 1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_hundred_hz_one_second_span() {
        let start = at(0, 0, 0, 0);

        assert_eq!(end_time(100.0, start, 101).unwrap(), at(0, 0, 1, 0));

        let h = HeaderRecord::build(100.0, start, 101).unwrap();
        assert_eq!(h.end_fields()[5], 1.0);
    }

    #[test]
    fn test_span_is_not_truncated_before_rounding() {
        // 3 выборки при 3 Гц: 2/3 с = 666 666.67 мкс
        assert_eq!(end_time(3.0, at(0, 0, 0, 0), 3).unwrap(), at(0, 0, 0, 666_667));
    }

    #[test]
    fn test_seconds_field_divides_micros_by_100000() {
        let fields = calendar_fields(&at(12, 30, 15, 500_000));

        assert_eq!(fields[3], 12.0);
        assert_eq!(fields[4], 30.0);
        assert_eq!(fields[5], 20.0);

        let fields = calendar_fields(&at(0, 0, 0, 250));
        assert_eq!(fields[5], 0.0025);
    }

    #[test]
    fn test_end_crosses_day_boundary() {
        let h = HeaderRecord::build(1.0, at(23, 59, 59, 0), 3).unwrap();

        assert_eq!(h.end_fields(), [2024.0, 1.0, 2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_channel_ends_at_start() {
        let start = at(1, 2, 3, 0);

        assert_eq!(end_time(10.0, start, 0).unwrap(), start);
        assert_eq!(end_time(10.0, start, 1).unwrap(), start);
    }

    #[test]
    fn test_invalid_rate_and_overflow() {
        assert!(matches!(
            HeaderRecord::build(0.0, at(0, 0, 0, 0), 3),
            Err(ConvertError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            end_time(1e-300, at(0, 0, 0, 0), 3),
            Err(ConvertError::TimeOverflow(_))
        ));
    }

    #[test]
    fn test_fields_layout() {
        let h = HeaderRecord::build(250.0, at(0, 0, 0, 0), 1).unwrap();
        let f = h.fields();

        assert_eq!(f.len(), HEADER_FIELDS);
        assert_eq!(f[0], 250.0);
        assert_eq!(&f[1..7], &f[7..13]);
        assert_eq!(HeaderRecord::from_fields(*f), h);
    }
}
