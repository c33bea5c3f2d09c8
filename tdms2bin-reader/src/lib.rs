//! Чтение TDMS файлов
//!
//! Минимальная реализация формата National Instruments TDMS: сегменты,
//! метаданные объектов, свойства всех скалярных типов и сырые данные
//! числовых каналов (последовательные и чередующиеся). Результат:
//! [`tdms2bin_types::Container`].
//!
//! # Быстрый старт
//!
//! ```no_run
//! let container = tdms2bin_reader::read_tdms("run_001.tdms")?;
//! for group in &container.groups {
//!     println!("{}: {} channels", group.name, group.channels.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod error;
pub mod format;
pub mod reader;

use std::{fs::File, io::BufReader, path::Path};

use log::debug;
use tdms2bin_types::Container;

pub use error::*;
pub use format::*;
pub use reader::*;

/// Читает TDMS файл целиком в модель контейнера.
pub fn read_tdms<P: AsRef<Path>>(path: P) -> TdmsResult<Container> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let container = TdmsReader::new(BufReader::new(file))?.read_container()?;

    debug!(
        "Read {:?}: groups {:?}",
        path,
        container.group_names()
    );

    Ok(container)
}
