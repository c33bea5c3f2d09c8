//! Последовательность конвертации:
//! проверка структуры → время → каналы (масштаб → заголовок → запись).

use std::{path::PathBuf, time::Instant};

use log::Level;
use serde::Serialize;
use tdms2bin_types::{Channel, Container};

use crate::{
    config::ConverterConfig,
    convert::{scale_channel, ChannelArtifact},
    diagnostics::Diagnostics,
    emit::BinaryEmitter,
    error::{ConvertError, ConvertResult},
    header::HeaderRecord,
    metrics::{memory_snapshot, RunMetrics, RunSummary},
    scaling::{lookup_scaling, ScalingCoefficients},
    time::{ChannelTiming, TimeProperties},
    validate::validate_structure,
};

/// Состояние запуска.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Uninitialized,
    Validated,
    TimeResolved,
    Done,
}

/// Этап обработки канала, на котором произошла ошибка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStage {
    Scaled,
    HeaderBuilt,
    Written,
}

/// Пропущенный канал.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub stage: ChannelStage,
    pub error: String,
}

/// Однопоточный конвертер одного контейнера.
pub struct Converter<'d> {
    config: ConverterConfig,
    diag: &'d dyn Diagnostics,
    state: RunState,
    metrics: RunMetrics,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<'d> Converter<'d> {
    pub fn new(
        config: ConverterConfig,
        diag: &'d dyn Diagnostics,
    ) -> Self {
        Self {
            config,
            diag,
            state: RunState::Uninitialized,
            metrics: RunMetrics::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Конвертирует все каналы группы данных.
    ///
    /// Ошибки структуры и времени прерывают запуск до записи файлов.
    /// Ошибка отдельного канала попадает в сводку, остальные каналы
    /// обрабатываются дальше.
    pub fn run(
        &mut self,
        container: &mut Container,
    ) -> ConvertResult<RunSummary> {
        if self.state != RunState::Uninitialized {
            return Err(ConvertError::InvalidState {
                expected: RunState::Uninitialized,
                found: self.state,
            });
        }

        let started = Instant::now();
        let data_group = self.config.data_group.clone();

        validate_structure(container, &data_group, &self.config.scale_group, self.diag)?;
        self.state = RunState::Validated;

        let time = TimeProperties::resolve(container, self.diag)?;
        let written = time.propagate(container, &data_group, self.diag)?;
        self.state = RunState::TimeResolved;
        self.diag.emit(
            Level::Debug,
            format_args!("Propagated {written} time properties into [{data_group}]"),
        );

        let container: &Container = container;
        let group = container
            .group(&data_group)
            .ok_or_else(|| ConvertError::MissingGroups {
                missing: vec![data_group.clone()],
                found: container.group_names().iter().map(|s| s.to_string()).collect(),
            })?;

        let emitter = BinaryEmitter::new(self.config.out_root());
        let total = group.channels.len();
        let mut artifacts = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (idx, channel) in group.channels.iter().enumerate() {
            let channel_started = Instant::now();

            self.diag.emit(
                Level::Info,
                format_args!("[{}/{total}] Processing channel: {}", idx + 1, channel.name),
            );

            match self.convert_channel(container, channel, &emitter) {
                Ok(path) => {
                    self.diag.emit(
                        Level::Info,
                        format_args!("Wrote {}", path.display()),
                    );
                    artifacts.push(path);
                }
                Err((stage, e)) => {
                    self.diag.emit(
                        Level::Error,
                        format_args!("Skipping channel {} at {stage:?}: {e}", channel.name),
                    );
                    self.metrics.record_failed();
                    failures.push(ChannelFailure {
                        channel: channel.name.clone(),
                        stage,
                        error: e.to_string(),
                    });
                }
            }

            let mem = memory_snapshot();
            self.diag.emit(
                Level::Debug,
                format_args!(
                    "Channel {} done in {:.3}s (elapsed {:.3}s), memory: {:.1} MB current, {:.1} MB peak",
                    channel.name,
                    channel_started.elapsed().as_secs_f64(),
                    started.elapsed().as_secs_f64(),
                    mem.current_mb(),
                    mem.peak_mb()
                ),
            );
        }

        self.state = RunState::Done;

        Ok(self.metrics.summary(
            self.config.source_path.clone(),
            &started,
            artifacts,
            failures,
        ))
    }

    fn convert_channel(
        &self,
        container: &Container,
        channel: &Channel,
        emitter: &BinaryEmitter,
    ) -> Result<PathBuf, (ChannelStage, ConvertError)> {
        let coeffs = match lookup_scaling(container, &self.config.scale_group, &channel.name) {
            Ok(c) => c,
            Err(e) => {
                self.diag.emit(
                    Level::Warn,
                    format_args!("Scaling for {} unavailable ({e}), using offset 0, gain 1", channel.name),
                );
                self.metrics.record_scaling_default();
                ScalingCoefficients::IDENTITY
            }
        };

        self.diag.emit(
            Level::Debug,
            format_args!(
                "{}: offset {}, gain {}",
                channel.name, coeffs.offset, coeffs.gain
            ),
        );

        let samples = scale_channel(channel, &coeffs).map_err(|e| (ChannelStage::Scaled, e))?;

        let header = ChannelTiming::from_channel(channel)
            .and_then(|t| HeaderRecord::build(t.sample_rate, t.start_time, samples.len()))
            .map_err(|e| (ChannelStage::HeaderBuilt, e))?;

        let artifact = ChannelArtifact::new(channel.name.clone(), header, samples);
        let path = emitter
            .write(&artifact)
            .map_err(|e| (ChannelStage::Written, e))?;

        self.metrics
            .record_written(artifact.samples.len(), artifact.byte_len());

        Ok(path)
    }
}

/// Читает TDMS файл и конвертирует его.
pub fn convert_file(
    config: ConverterConfig,
    diag: &dyn Diagnostics,
) -> ConvertResult<RunSummary> {
    diag.emit(
        Level::Info,
        format_args!("Reading {}", config.source_path.display()),
    );

    let mut container = tdms2bin_reader::read_tdms(&config.source_path)?;

    diag.emit(
        Level::Debug,
        format_args!("Groups in container: {:?}", container.group_names()),
    );

    Converter::new(config, diag).run(&mut container)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
