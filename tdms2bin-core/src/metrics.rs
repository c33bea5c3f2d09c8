//! Диагностические метрики запуска: счётчики, время и память.
//!
//! Метрики носят справочный характер и не влияют на выходные файлы.

use std::{
    alloc::{GlobalAlloc, Layout, System},
    path::PathBuf,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
    time::Instant,
};

use serde::Serialize;

use crate::orchestrator::ChannelFailure;

static CURRENT_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Системный аллокатор со счётчиком занятой памяти.
///
/// Подключается бинарником через `#[global_allocator]`. Без него
/// [`memory_snapshot`] возвращает нули.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAllocator;

impl TrackingAllocator {
    fn record_alloc(size: usize) {
        let now = CURRENT_BYTES.fetch_add(size, Ordering::Relaxed) + size;
        PEAK_BYTES.fetch_max(now, Ordering::Relaxed);
    }

    fn record_dealloc(size: usize) {
        CURRENT_BYTES.fetch_sub(size, Ordering::Relaxed);
    }
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(
        &self,
        layout: Layout,
    ) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(
        &self,
        layout: Layout,
    ) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(
        &self,
        ptr: *mut u8,
        layout: Layout,
    ) {
        unsafe { System.dealloc(ptr, layout) };
        Self::record_dealloc(layout.size());
    }

    unsafe fn realloc(
        &self,
        ptr: *mut u8,
        layout: Layout,
        new_size: usize,
    ) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            Self::record_dealloc(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}

/// Текущая и пиковая занятая память, байт.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub current_bytes: usize,
    pub peak_bytes: usize,
}

impl MemorySnapshot {
    pub fn current_mb(&self) -> f64 {
        self.current_bytes as f64 / 1e6
    }

    pub fn peak_mb(&self) -> f64 {
        self.peak_bytes as f64 / 1e6
    }
}

pub fn memory_snapshot() -> MemorySnapshot {
    MemorySnapshot {
        current_bytes: CURRENT_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
    }
}

/// Счётчики запуска.
#[derive(Debug, Default)]
pub struct RunMetrics {
    pub channels_written: AtomicU64,
    pub channels_failed: AtomicU64,
    pub samples_written: AtomicU64,
    pub bytes_written: AtomicU64,
    /// Каналы, получившие тождественные коэффициенты
    pub scaling_defaults: AtomicU64,
}

/// Итоговая сводка запуска.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub duration_secs: f64,
    pub channels_total: u64,
    pub channels_written: u64,
    pub channels_failed: u64,
    pub samples_written: u64,
    pub bytes_written: u64,
    pub scaling_defaults: u64,
    pub memory: MemorySnapshot,
    pub artifacts: Vec<PathBuf>,
    pub failures: Vec<ChannelFailure>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Учитывает записанный файл канала.
    pub fn record_written(
        &self,
        samples: usize,
        bytes: usize,
    ) {
        self.channels_written.fetch_add(1, Ordering::Relaxed);
        self.samples_written
            .fetch_add(samples as u64, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.channels_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scaling_default(&self) {
        self.scaling_defaults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(
        &self,
        source: PathBuf,
        elapsed: &Instant,
        artifacts: Vec<PathBuf>,
        failures: Vec<ChannelFailure>,
    ) -> RunSummary {
        let channels_written = self.channels_written.load(Ordering::Relaxed);
        let channels_failed = self.channels_failed.load(Ordering::Relaxed);

        RunSummary {
            source,
            duration_secs: elapsed.elapsed().as_secs_f64(),
            channels_total: channels_written + channels_failed,
            channels_written,
            channels_failed,
            samples_written: self.samples_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            scaling_defaults: self.scaling_defaults.load(Ordering::Relaxed),
            memory: memory_snapshot(),
            artifacts,
            failures,
        }
    }
}

impl RunSummary {
    /// Все каналы записаны.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Source          : {}", self.source.display())?;
        writeln!(f, "  Duration        : {:.3}s", self.duration_secs)?;
        writeln!(
            f,
            "  Channels        : {} written, {} failed",
            self.channels_written, self.channels_failed
        )?;
        writeln!(f, "  Samples         : {}", self.samples_written)?;
        writeln!(
            f,
            "  Bytes written   : {:.3} MB",
            self.bytes_written as f64 / 1e6
        )?;
        writeln!(f, "  Default scaling : {}", self.scaling_defaults)?;
        writeln!(
            f,
            "  Memory          : {:.1} MB current, {:.1} MB peak",
            self.memory.current_mb(),
            self.memory.peak_mb()
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  FAILED {} ({:?}): {}",
                failure.channel, failure.stage, failure.error
            )?;
        }
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::orchestrator::ChannelStage;

    #[test]
    fn test_initial_metrics_zero() {
        let metrics = RunMetrics::new();
        let summary = metrics.summary("a.tdms".into(), &Instant::now(), vec![], vec![]);

        assert_eq!(summary.channels_total, 0);
        assert_eq!(summary.samples_written, 0);
        assert_eq!(summary.bytes_written, 0);
        assert!(summary.is_success());
    }

    #[test]
    fn test_record_and_summarize() {
        let metrics = RunMetrics::new();
        metrics.record_written(3, 64);
        metrics.record_written(10, 92);
        metrics.record_failed();
        metrics.record_scaling_default();

        let start = Instant::now() - Duration::from_millis(500);
        let failures = vec![ChannelFailure {
            channel: "bad".into(),
            stage: ChannelStage::Scaled,
            error: "boom".into(),
        }];
        let summary = metrics.summary("a.tdms".into(), &start, vec![], failures);

        assert_eq!(summary.channels_total, 3);
        assert_eq!(summary.channels_written, 2);
        assert_eq!(summary.samples_written, 13);
        assert_eq!(summary.bytes_written, 156);
        assert_eq!(summary.scaling_defaults, 1);
        assert!(summary.duration_secs >= 0.5);
        assert!(!summary.is_success());

        let text = summary.to_string();
        assert!(text.contains("2 written, 1 failed"));
        assert!(text.contains("FAILED bad (Scaled): boom"));
    }

    #[test]
    fn test_tracking_allocator_counts() {
        let alloc = TrackingAllocator;
        let layout = Layout::from_size_align(4096, 8).unwrap();

        let before = memory_snapshot();
        unsafe {
            let ptr = alloc.alloc(layout);
            assert!(!ptr.is_null());
            assert!(memory_snapshot().peak_bytes >= before.current_bytes + 4096);
            alloc.dealloc(ptr, layout);
        }
    }
}
