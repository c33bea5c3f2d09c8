//! Конвертация TDMS контейнера в поканальные .bin файлы
//!
//! Для каждого канала группы данных создаётся файл
//! `{out_root}.{channel}.bin`: заголовок из 13 значений f32 (частота,
//! календарное время начала и окончания), за которым следуют
//! масштабированные выборки `offset + gain * raw`. Все значения
//! little-endian.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use tdms2bin_core::{convert_file, ConverterConfig, LogDiagnostics};
//!
//! let summary = convert_file(ConverterConfig::new("run_001.tdms"), &LogDiagnostics)?;
//! println!("{summary}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod header;
pub mod metrics;
pub mod orchestrator;
pub mod scaling;
pub mod time;
pub mod validate;

pub use config::*;
pub use convert::*;
pub use diagnostics::*;
pub use emit::*;
pub use error::*;
pub use header::*;
pub use metrics::*;
pub use orchestrator::*;
pub use scaling::*;
pub use time::*;
pub use validate::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
