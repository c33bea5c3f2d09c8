use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use tempfile::Builder;

use crate::{
    convert::ChannelArtifact,
    error::{ConvertError, ConvertResult},
    header::{HeaderRecord, HEADER_FIELDS, HEADER_SIZE},
};

/// Имя выходного файла канала: `{out_root}.{name}.bin`, где `/` в имени
/// канала заменены на `.`.
///
/// # Примеры
/// ```
/// use std::path::{Path, PathBuf};
/// use tdms2bin_core::artifact_path;
///
/// assert_eq!(
///     artifact_path(Path::new("out/run"), "ch/x"),
///     PathBuf::from("out/run.ch.x.bin")
/// );
/// ```
pub fn artifact_path(
    out_root: &Path,
    channel_name: &str,
) -> PathBuf {
    let mut name = out_root.as_os_str().to_os_string();
    name.push(".");
    name.push(channel_name.replace('/', "."));
    name.push(".bin");

    PathBuf::from(name)
}

/// Пишет выходные файлы каналов.
///
/// Файл сначала целиком пишется во временный файл в том же каталоге и
/// затем атомарно переименовывается, поэтому существующий файл заменяется
/// либо полностью, либо никак.
#[derive(Debug, Clone)]
pub struct BinaryEmitter {
    out_root: PathBuf,
}

impl BinaryEmitter {
    pub fn new<P: Into<PathBuf>>(out_root: P) -> Self {
        Self {
            out_root: out_root.into(),
        }
    }

    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    pub fn artifact_path(
        &self,
        channel_name: &str,
    ) -> PathBuf {
        artifact_path(&self.out_root, channel_name)
    }

    /// Записывает артефакт и возвращает путь к нему.
    pub fn write(
        &self,
        artifact: &ChannelArtifact,
    ) -> ConvertResult<PathBuf> {
        let path = self.artifact_path(&artifact.channel);

        write_atomic(&path, artifact).map_err(|error| ConvertError::OutputWrite {
            path: path.clone(),
            error,
        })?;

        Ok(path)
    }
}

fn write_atomic(
    path: &Path,
    artifact: &ChannelArtifact,
) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = Builder::new();
    // 0o666 до umask, как у fs::write
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let tmp = builder.tempfile_in(dir)?;
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }

    let mut writer = BufWriter::new(tmp);

    for value in artifact.values() {
        writer.write_f32::<LittleEndian>(value)?;
    }
    writer.flush()?;

    let tmp = writer.into_inner().map_err(|e| e.into_error())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Читает выходной файл обратно: заголовок и данные.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> ConvertResult<(HeaderRecord, Vec<f32>)> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    if bytes.len() < HEADER_SIZE {
        return Err(ConvertError::invalid_artifact(format!(
            "{}: {} bytes is shorter than the {HEADER_SIZE}-byte header",
            path.display(),
            bytes.len()
        )));
    }
    if bytes.len() % 4 != 0 {
        return Err(ConvertError::invalid_artifact(format!(
            "{}: length {} is not a multiple of 4",
            path.display(),
            bytes.len()
        )));
    }

    let mut fields = [0f32; HEADER_FIELDS];
    LittleEndian::read_f32_into(&bytes[..HEADER_SIZE], &mut fields);

    let mut samples = vec![0f32; (bytes.len() - HEADER_SIZE) / 4];
    LittleEndian::read_f32_into(&bytes[HEADER_SIZE..], &mut samples);

    Ok((HeaderRecord::from_fields(fields), samples))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;

    fn artifact(
        name: &str,
        samples: Vec<f32>,
    ) -> ChannelArtifact {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let header = HeaderRecord::build(1.0, start, samples.len()).unwrap();

        ChannelArtifact::new(name, header, samples)
    }

    #[test]
    fn test_artifact_path_replaces_slashes() {
        assert_eq!(
            artifact_path(Path::new("out"), "ch1"),
            PathBuf::from("out.ch1.bin")
        );
        assert_eq!(
            artifact_path(Path::new("/tmp/run.v2"), "a/b/c"),
            PathBuf::from("/tmp/run.v2.a.b.c.bin")
        );
    }

    #[test]
    fn test_write_little_endian_layout() {
        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("out"));

        let path = emitter.write(&artifact("ch1", vec![12.0, 14.0, 16.0])).unwrap();
        let bytes = fs::read(&path).unwrap();

        assert_eq!(path, dir.path().join("out.ch1.bin"));
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2024.0f32.to_le_bytes());
        assert_eq!(&bytes[52..56], &12.0f32.to_le_bytes());
        assert_eq!(&bytes[60..64], &16.0f32.to_le_bytes());
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("out"));
        fs::write(emitter.artifact_path("ch1"), vec![0u8; 1000]).unwrap();

        let path = emitter.write(&artifact("ch1", vec![1.0])).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 56);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_gets_default_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("out"));
        let control = dir.path().join("control.bin");
        fs::write(&control, [0u8; 4]).unwrap();

        let path = emitter.write(&artifact("ch1", vec![1.0])).unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&control));
    }

    #[cfg(unix)]
    #[test]
    fn test_overwrite_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("out"));
        let target = emitter.artifact_path("ch1");
        fs::write(&target, [0u8; 8]).unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();

        let path = emitter.write(&artifact("ch1", vec![1.0])).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("nope").join("out"));

        let err = emitter.write(&artifact("ch1", vec![1.0])).unwrap_err();

        assert!(matches!(err, ConvertError::OutputWrite { .. }));
    }

    #[test]
    fn test_read_artifact_back() {
        let dir = tempdir().unwrap();
        let emitter = BinaryEmitter::new(dir.path().join("out"));
        let original = artifact("x", vec![-1.5, 0.25]);

        let path = emitter.write(&original).unwrap();
        let (header, samples) = read_artifact(&path).unwrap();

        assert_eq!(header, original.header);
        assert_eq!(samples, original.samples);
    }

    #[test]
    fn test_read_artifact_rejects_short_or_ragged_files() {
        let dir = tempdir().unwrap();

        let short = dir.path().join("short.bin");
        fs::write(&short, [0u8; 20]).unwrap();
        assert!(matches!(
            read_artifact(&short),
            Err(ConvertError::InvalidArtifact(_))
        ));

        let ragged = dir.path().join("ragged.bin");
        fs::write(&ragged, [0u8; 54]).unwrap();
        assert!(matches!(
            read_artifact(&ragged),
            Err(ConvertError::InvalidArtifact(_))
        ));
    }
}
