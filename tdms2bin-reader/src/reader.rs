use std::{
    collections::HashMap,
    io::{Cursor, Read, Seek, SeekFrom},
};

use log::{debug, warn};
use tdms2bin_types::{Channel, ChannelData, Container, Properties};

use crate::{
    binary::{
        decode_numeric_local, read_property_local, read_string_local, read_u32_local,
        read_u64_local,
    },
    error::{TdmsError, TdmsResult},
    format::{
        DataType, LeadIn, ObjectPath, INCOMPLETE_SEGMENT, LEAD_IN_SIZE, RAW_INDEX_DAQMX,
        RAW_INDEX_NONE, RAW_INDEX_SAME, TOC_DAQMX_RAW_DATA, TOC_INTERLEAVED_DATA, TOC_META_DATA,
        TOC_NEW_OBJ_LIST, TOC_RAW_DATA,
    },
};

/// Индекс сырых данных объекта внутри сегмента.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawIndex {
    /// Тип значений
    pub data_type: DataType,
    /// Количество значений в одном чанке
    pub count: u64,
    /// Размер данных объекта в одном чанке (байт)
    pub total_size: u64,
}

/// Объект из текущего списка сегмента.
#[derive(Debug, Clone)]
struct ActiveObject {
    path: ObjectPath,
    index: Option<RawIndex>,
}

/// Статистика, накопленная [`TdmsReader`] в процессе чтения.
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    /// Прочитано сегментов.
    pub segments: u64,
    /// Записей объектов в метаданных.
    pub objects: u64,
    /// Декодировано числовых значений.
    pub values_read: u64,
    /// Пропущено байт нечисловых данных.
    pub bytes_skipped: u64,
}

/// Последовательный читатель сегментов TDMS.
///
/// Собирает все сегменты файла в один [`Container`], сохраняя порядок
/// появления групп и каналов.
pub struct TdmsReader<R: Read + Seek> {
    reader: R,
    file_len: u64,
    container: Container,
    active: Vec<ActiveObject>,
    last_index: HashMap<ObjectPath, RawIndex>,
    stats: ReadStats,
}

impl<R: Read + Seek> TdmsReader<R> {
    pub fn new(mut inner: R) -> TdmsResult<Self> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader: inner,
            file_len,
            container: Container::new(),
            active: Vec::new(),
            last_index: HashMap::new(),
            stats: ReadStats::default(),
        })
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Читает все сегменты и возвращает контейнер.
    pub fn read_container(mut self) -> TdmsResult<Container> {
        let mut pos = 0u64;

        while pos < self.file_len {
            pos = self.read_segment(pos)?;
        }

        debug!(
            "Read {} segments, {} object entries, {} values ({} bytes skipped)",
            self.stats.segments,
            self.stats.objects,
            self.stats.values_read,
            self.stats.bytes_skipped
        );

        Ok(self.container)
    }

    /// Читает сегмент, начинающийся с `pos`. Возвращает смещение следующего.
    fn read_segment(
        &mut self,
        pos: u64,
    ) -> TdmsResult<u64> {
        let left = self.file_len - pos;
        if left < LEAD_IN_SIZE as u64 {
            warn!("Ignoring {left} trailing bytes at offset {pos}");
            return Ok(self.file_len);
        }

        self.reader.seek(SeekFrom::Start(pos))?;
        let mut buf = [0u8; LEAD_IN_SIZE];
        self.reader.read_exact(&mut buf)?;

        let lead_in = LeadIn::deserialize(&buf)?;
        let is_le = lead_in.is_little_endian();
        let body_start = pos + LEAD_IN_SIZE as u64;
        let body_left = self.file_len - body_start;

        let (segment_end, truncated) = if lead_in.next_segment_offset == INCOMPLETE_SEGMENT {
            warn!("Segment at offset {pos} is incomplete, reading up to end of file");
            (self.file_len, true)
        } else if lead_in.next_segment_offset > body_left {
            warn!(
                "Segment at offset {pos} claims {} bytes, only {body_left} available",
                lead_in.next_segment_offset
            );
            (self.file_len, true)
        } else {
            (body_start + lead_in.next_segment_offset, false)
        };

        if lead_in.raw_data_offset > segment_end - body_start {
            return Err(TdmsError::corrupted(format!(
                "Raw data offset {} exceeds segment at offset {pos}",
                lead_in.raw_data_offset
            )));
        }

        if lead_in.has(TOC_DAQMX_RAW_DATA) {
            return Err(TdmsError::DaqmxUnsupported(format!("segment at offset {pos}")));
        }

        if lead_in.has(TOC_META_DATA) {
            let mut meta = vec![0u8; lead_in.raw_data_offset as usize];
            self.reader.read_exact(&mut meta)?;
            self.read_metadata(
                &mut Cursor::new(meta),
                lead_in.has(TOC_NEW_OBJ_LIST),
                is_le,
            )?;
        }

        if lead_in.has(TOC_RAW_DATA) {
            let data_start = body_start + lead_in.raw_data_offset;
            self.reader.seek(SeekFrom::Start(data_start))?;
            self.read_raw_data(
                segment_end - data_start,
                lead_in.has(TOC_INTERLEAVED_DATA),
                truncated,
                is_le,
            )?;
        }

        debug!(
            "Segment #{} at offset {pos}: toc=0x{:02x}, {} active objects",
            self.stats.segments,
            lead_in.toc,
            self.active.len()
        );
        self.stats.segments += 1;

        Ok(segment_end)
    }

    fn read_metadata(
        &mut self,
        r: &mut Cursor<Vec<u8>>,
        new_obj_list: bool,
        is_le: bool,
    ) -> TdmsResult<()> {
        if new_obj_list {
            self.active.clear();
        }

        let n_objects = read_u32_local(r, is_le)?;

        for _ in 0..n_objects {
            let raw_path = read_string_local(r, is_le)?;
            let path = ObjectPath::parse(&raw_path)?;

            // Создаём объект сразу, чтобы сохранить порядок появления
            properties_mut(&mut self.container, &path);

            let index = self.read_raw_index(r, &path, is_le)?;
            if let Some(idx) = index {
                self.last_index.insert(path.clone(), idx);
            }

            match self.active.iter_mut().find(|o| o.path == path) {
                Some(obj) => obj.index = index,
                None => self.active.push(ActiveObject {
                    path: path.clone(),
                    index,
                }),
            }

            let n_props = read_u32_local(r, is_le)?;
            for _ in 0..n_props {
                let name = read_string_local(r, is_le)?;
                let code = read_u32_local(r, is_le)?;
                let data_type = DataType::from_u32(code).map_err(|_| {
                    TdmsError::UnsupportedPropertyType {
                        path: path.to_string(),
                        property: name.clone(),
                        code,
                    }
                })?;
                let value = read_property_local(r, data_type, is_le)?;

                properties_mut(&mut self.container, &path).insert(name, value);
            }

            self.stats.objects += 1;
        }

        Ok(())
    }

    fn read_raw_index(
        &self,
        r: &mut Cursor<Vec<u8>>,
        path: &ObjectPath,
        is_le: bool,
    ) -> TdmsResult<Option<RawIndex>> {
        match read_u32_local(r, is_le)? {
            RAW_INDEX_NONE => Ok(None),
            RAW_INDEX_SAME => self.last_index.get(path).copied().map(Some).ok_or_else(|| {
                TdmsError::corrupted(format!("{path}: raw data index reused before definition"))
            }),
            h if RAW_INDEX_DAQMX.contains(&h) => Err(TdmsError::DaqmxUnsupported(path.to_string())),
            _ => {
                let data_type = DataType::from_u32(read_u32_local(r, is_le)?)?;

                let dimension = read_u32_local(r, is_le)?;
                if dimension != 1 {
                    return Err(TdmsError::corrupted(format!(
                        "{path}: array dimension {dimension}, expected 1"
                    )));
                }

                let count = read_u64_local(r, is_le)?;
                let total_size = match data_type.fixed_size() {
                    Some(size) => count.checked_mul(size as u64).ok_or_else(|| {
                        TdmsError::corrupted(format!("{path}: value count {count} overflows"))
                    })?,
                    None => read_u64_local(r, is_le)?,
                };

                Ok(Some(RawIndex {
                    data_type,
                    count,
                    total_size,
                }))
            }
        }
    }

    fn read_raw_data(
        &mut self,
        size: u64,
        interleaved: bool,
        truncated: bool,
        is_le: bool,
    ) -> TdmsResult<()> {
        let objects: Vec<(ObjectPath, RawIndex)> = self
            .active
            .iter()
            .filter_map(|o| o.index.map(|idx| (o.path.clone(), idx)))
            .collect();

        let chunk_size: u64 = objects.iter().map(|(_, idx)| idx.total_size).sum();
        if chunk_size == 0 {
            return Ok(());
        }

        let n_chunks = size / chunk_size;
        let remainder = size % chunk_size;
        if remainder != 0 && !truncated {
            warn!(
                "Raw data size {size} is not a multiple of chunk size {chunk_size}, \
                 ignoring {remainder} trailing bytes"
            );
        }

        for _ in 0..n_chunks {
            if interleaved {
                self.read_interleaved_chunk(&objects, objects[0].1.count, is_le)?;
            } else {
                self.read_contiguous_chunk(&objects, is_le)?;
            }
        }

        if remainder != 0 && truncated {
            self.read_partial_chunk(&objects, remainder, interleaved, is_le)?;
        }

        Ok(())
    }

    /// Хвост последнего незавершённого сегмента: читаются только значения,
    /// уместившиеся целиком.
    fn read_partial_chunk(
        &mut self,
        objects: &[(ObjectPath, RawIndex)],
        size: u64,
        interleaved: bool,
        is_le: bool,
    ) -> TdmsResult<()> {
        if interleaved {
            let row_size: u64 = interleaved_sizes(objects)?.iter().map(|&s| s as u64).sum();
            if row_size == 0 {
                return Ok(());
            }
            let rows = size / row_size;
            debug!("Reading {rows} interleaved rows from a partial chunk of {size} bytes");

            return self.read_interleaved_chunk(objects, rows, is_le);
        }

        let mut left = size;
        for (path, idx) in objects {
            if !idx.data_type.is_numeric() {
                if idx.total_size > left {
                    break;
                }
                self.reader.seek(SeekFrom::Current(idx.total_size as i64))?;
                self.stats.bytes_skipped += idx.total_size;
                self.store_values(path, idx, &[], is_le);
                left -= idx.total_size;
                continue;
            }

            let type_size = idx.data_type.fixed_size().unwrap_or(1).max(1) as u64;
            let count = idx.count.min(left / type_size);
            if count > 0 {
                let partial = RawIndex {
                    count,
                    total_size: count * type_size,
                    ..*idx
                };
                let mut buf = vec![0u8; partial.total_size as usize];
                self.reader.read_exact(&mut buf)?;
                self.store_values(path, &partial, &buf, is_le);
                left -= partial.total_size;
            }

            if count < idx.count {
                debug!("{path}: partial chunk holds {count} of {} values", idx.count);
                break;
            }
        }

        Ok(())
    }

    fn read_contiguous_chunk(
        &mut self,
        objects: &[(ObjectPath, RawIndex)],
        is_le: bool,
    ) -> TdmsResult<()> {
        for (path, idx) in objects {
            if idx.data_type.is_numeric() {
                let mut buf = vec![0u8; idx.total_size as usize];
                self.reader.read_exact(&mut buf)?;
                self.store_values(path, idx, &buf, is_le);
            } else {
                self.reader.seek(SeekFrom::Current(idx.total_size as i64))?;
                self.stats.bytes_skipped += idx.total_size;
                self.store_values(path, idx, &[], is_le);
            }
        }

        Ok(())
    }

    fn read_interleaved_chunk(
        &mut self,
        objects: &[(ObjectPath, RawIndex)],
        rows: u64,
        is_le: bool,
    ) -> TdmsResult<()> {
        let sizes = interleaved_sizes(objects)?;
        let row_size: usize = sizes.iter().sum();
        let mut buf = vec![0u8; row_size * rows as usize];
        self.reader.read_exact(&mut buf)?;

        let mut columns: Vec<Vec<u8>> = sizes
            .iter()
            .map(|s| Vec::with_capacity(s * rows as usize))
            .collect();

        for row in buf.chunks_exact(row_size) {
            let mut off = 0;
            for (column, size) in columns.iter_mut().zip(&sizes) {
                column.extend_from_slice(&row[off..off + size]);
                off += size;
            }
        }

        for ((path, idx), (column, size)) in objects.iter().zip(columns.iter().zip(&sizes)) {
            let index = RawIndex {
                count: rows,
                total_size: rows * *size as u64,
                ..*idx
            };
            self.store_values(path, &index, column, is_le);
        }

        Ok(())
    }

    fn store_values(
        &mut self,
        path: &ObjectPath,
        index: &RawIndex,
        bytes: &[u8],
        is_le: bool,
    ) {
        let Some(channel) = channel_mut(&mut self.container, path) else {
            debug!("Discarding raw data of non-channel object {path}");
            return;
        };

        if index.data_type.is_numeric() {
            let values = decode_numeric_local(index.data_type, bytes, is_le);
            self.stats.values_read += values.len() as u64;
            append_numeric(channel, values);
        } else {
            mark_non_numeric(channel, index.data_type, index.count);
        }
    }
}

/// Размеры значений строки чередующегося блока. Все объекты должны иметь
/// фиксированный размер и одинаковое число значений.
fn interleaved_sizes(objects: &[(ObjectPath, RawIndex)]) -> TdmsResult<Vec<usize>> {
    let sizes = objects
        .iter()
        .map(|(path, idx)| {
            idx.data_type.fixed_size().ok_or_else(|| {
                TdmsError::corrupted(format!("{path}: variable-size data cannot be interleaved"))
            })
        })
        .collect::<TdmsResult<Vec<usize>>>()?;

    let count = objects[0].1.count;
    if objects.iter().any(|(_, idx)| idx.count != count) {
        return Err(TdmsError::corrupted(
            "Interleaved objects have different value counts",
        ));
    }

    Ok(sizes)
}

fn properties_mut<'a>(
    container: &'a mut Container,
    path: &ObjectPath,
) -> &'a mut Properties {
    match path {
        ObjectPath::Root => &mut container.properties,
        ObjectPath::Group(group) => &mut container.group_or_insert(group).properties,
        ObjectPath::Channel { group, channel } => {
            &mut container
                .group_or_insert(group)
                .channel_or_insert(channel)
                .properties
        }
    }
}

fn channel_mut<'a>(
    container: &'a mut Container,
    path: &ObjectPath,
) -> Option<&'a mut Channel> {
    match path {
        ObjectPath::Channel { group, channel } => {
            Some(container.group_or_insert(group).channel_or_insert(channel))
        }
        _ => None,
    }
}

fn append_numeric(
    channel: &mut Channel,
    values: Vec<f64>,
) {
    match &mut channel.data {
        ChannelData::Numeric(samples) => samples.extend(values),
        ChannelData::NonNumeric { count, .. } => *count += values.len() as u64,
    }
}

fn mark_non_numeric(
    channel: &mut Channel,
    data_type: DataType,
    n: u64,
) {
    if let ChannelData::NonNumeric { count, .. } = &mut channel.data {
        *count += n;
        return;
    }

    let existing = channel.len() as u64;
    channel.data = ChannelData::NonNumeric {
        type_name: data_type.name().to_string(),
        count: existing + n,
    };
}
