//! Диагностический контекст конвертера.
//!
//! Компоненты не пишут в глобальный логгер напрямую: приёмник сообщений
//! передаётся явно, поэтому тесты могут перехватывать или подавлять вывод.

use std::{fmt, sync::Mutex};

use log::Level;

/// Приёмник диагностических сообщений.
pub trait Diagnostics {
    fn emit(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
    );
}

/// Передаёт сообщения фасаду `log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
    ) {
        log::log!(level, "{args}");
    }
}

/// Накапливает сообщения в памяти.
#[derive(Debug, Default)]
pub struct CapturedDiagnostics {
    records: Mutex<Vec<(Level, String)>>,
}

impl CapturedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Копия всех сообщений в порядке поступления.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Количество сообщений заданного уровня.
    pub fn count(
        &self,
        level: Level,
    ) -> usize {
        self.records().iter().filter(|(l, _)| *l == level).count()
    }

    /// Есть ли сообщение уровня `level`, содержащее `needle`.
    pub fn contains(
        &self,
        level: Level,
        needle: &str,
    ) -> bool {
        self.records()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl Diagnostics for CapturedDiagnostics {
    fn emit(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
    ) {
        if let Ok(mut records) = self.records.lock() {
            records.push((level, args.to_string()));
        }
    }
}
