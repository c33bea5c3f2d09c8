use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use tdms2bin_types::PropertyValue;

use crate::{
    error::{TdmsError, TdmsResult},
    format::{labview_timestamp, DataType},
};

pub fn read_u32_local<R: Read>(
    r: &mut R,
    is_le: bool,
) -> TdmsResult<u32> {
    let v = if is_le {
        r.read_u32::<LittleEndian>()?
    } else {
        r.read_u32::<BigEndian>()?
    };

    Ok(v)
}

pub fn read_u64_local<R: Read>(
    r: &mut R,
    is_le: bool,
) -> TdmsResult<u64> {
    let v = if is_le {
        r.read_u64::<LittleEndian>()?
    } else {
        r.read_u64::<BigEndian>()?
    };

    Ok(v)
}

/// Строка TDMS: длина u32 + UTF-8 байты.
pub fn read_string_local<R: Read>(
    r: &mut R,
    is_le: bool,
) -> TdmsResult<String> {
    let len = read_u32_local(r, is_le)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;

    String::from_utf8(buf).map_err(|e| TdmsError::corrupted(format!("Invalid UTF-8 string: {e}")))
}

/// Метка времени: в little-endian сначала доли, затем секунды.
pub fn read_timestamp_local<R: Read>(
    r: &mut R,
    is_le: bool,
) -> TdmsResult<PropertyValue> {
    let (seconds, fractions) = if is_le {
        let fractions = r.read_u64::<LittleEndian>()?;
        (r.read_i64::<LittleEndian>()?, fractions)
    } else {
        let seconds = r.read_i64::<BigEndian>()?;
        (seconds, r.read_u64::<BigEndian>()?)
    };

    Ok(PropertyValue::Timestamp(labview_timestamp(seconds, fractions)?))
}

/// Значение свойства заданного типа.
pub fn read_property_local<R: Read>(
    r: &mut R,
    data_type: DataType,
    is_le: bool,
) -> TdmsResult<PropertyValue> {
    if is_le {
        read_property::<LittleEndian, R>(r, data_type, is_le)
    } else {
        read_property::<BigEndian, R>(r, data_type, is_le)
    }
}

fn read_property<B: ByteOrder, R: Read>(
    r: &mut R,
    data_type: DataType,
    is_le: bool,
) -> TdmsResult<PropertyValue> {
    let value = match data_type {
        DataType::I8 => PropertyValue::Int(r.read_i8()? as i64),
        DataType::I16 => PropertyValue::Int(r.read_i16::<B>()? as i64),
        DataType::I32 => PropertyValue::Int(r.read_i32::<B>()? as i64),
        DataType::I64 => PropertyValue::Int(r.read_i64::<B>()?),
        DataType::U8 => PropertyValue::UInt(r.read_u8()? as u64),
        DataType::U16 => PropertyValue::UInt(r.read_u16::<B>()? as u64),
        DataType::U32 => PropertyValue::UInt(r.read_u32::<B>()? as u64),
        DataType::U64 => PropertyValue::UInt(r.read_u64::<B>()?),
        DataType::F32 | DataType::F32Unit => PropertyValue::Float(r.read_f32::<B>()? as f64),
        DataType::F64 | DataType::F64Unit => PropertyValue::Float(r.read_f64::<B>()?),
        DataType::String => PropertyValue::String(read_string_local(r, is_le)?),
        DataType::Bool => PropertyValue::Bool(r.read_u8()? != 0),
        DataType::Timestamp => read_timestamp_local(r, is_le)?,
        DataType::Void => {
            return Err(TdmsError::UnsupportedDataType(data_type.as_u32()));
        }
    };

    Ok(value)
}

/// Декодирует буфер сырых числовых значений в f64.
pub fn decode_numeric_local(
    data_type: DataType,
    buf: &[u8],
    is_le: bool,
) -> Vec<f64> {
    if is_le {
        decode_numeric::<LittleEndian>(data_type, buf)
    } else {
        decode_numeric::<BigEndian>(data_type, buf)
    }
}

fn decode_numeric<B: ByteOrder>(
    data_type: DataType,
    buf: &[u8],
) -> Vec<f64> {
    match data_type {
        DataType::I8 => buf.iter().map(|&b| b as i8 as f64).collect(),
        DataType::U8 => buf.iter().map(|&b| b as f64).collect(),
        DataType::Bool => buf.iter().map(|&b| if b != 0 { 1.0 } else { 0.0 }).collect(),
        DataType::I16 => buf.chunks_exact(2).map(|c| B::read_i16(c) as f64).collect(),
        DataType::U16 => buf.chunks_exact(2).map(|c| B::read_u16(c) as f64).collect(),
        DataType::I32 => buf.chunks_exact(4).map(|c| B::read_i32(c) as f64).collect(),
        DataType::U32 => buf.chunks_exact(4).map(|c| B::read_u32(c) as f64).collect(),
        DataType::I64 => buf.chunks_exact(8).map(|c| B::read_i64(c) as f64).collect(),
        DataType::U64 => buf.chunks_exact(8).map(|c| B::read_u64(c) as f64).collect(),
        DataType::F32 | DataType::F32Unit => {
            buf.chunks_exact(4).map(|c| B::read_f32(c) as f64).collect()
        }
        DataType::F64 | DataType::F64Unit => buf.chunks_exact(8).map(B::read_f64).collect(),
        DataType::Void | DataType::String | DataType::Timestamp => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_read_string_both_endians() {
        let mut le = Vec::new();
        le.extend_from_slice(&3u32.to_le_bytes());
        le.extend_from_slice(b"abc");
        let mut be = Vec::new();
        be.extend_from_slice(&3u32.to_be_bytes());
        be.extend_from_slice(b"abc");

        assert_eq!(read_string_local(&mut Cursor::new(le), true).unwrap(), "abc");
        assert_eq!(read_string_local(&mut Cursor::new(be), false).unwrap(), "abc");
    }

    #[test]
    fn test_read_property_big_endian_string() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(b"ok");

        let v = read_property_local(&mut Cursor::new(buf), DataType::String, false).unwrap();
        assert_eq!(v, PropertyValue::String("ok".into()));
    }

    #[test]
    fn test_read_property_numeric() {
        let v = read_property_local(
            &mut Cursor::new(250.0f64.to_le_bytes().to_vec()),
            DataType::F64,
            true,
        )
        .unwrap();
        assert_eq!(v, PropertyValue::Float(250.0));

        let v = read_property_local(
            &mut Cursor::new((-7i32).to_be_bytes().to_vec()),
            DataType::I32,
            false,
        )
        .unwrap();
        assert_eq!(v, PropertyValue::Int(-7));
    }

    #[test]
    fn test_read_property_truncated() {
        let res = read_property_local(&mut Cursor::new(vec![0u8; 3]), DataType::F64, true);
        assert!(matches!(res, Err(TdmsError::Io(_))));
    }

    #[test]
    fn test_decode_numeric() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(-2i16).to_le_bytes());
        buf.extend_from_slice(&300i16.to_le_bytes());
        assert_eq!(decode_numeric_local(DataType::I16, &buf, true), vec![-2.0, 300.0]);

        let mut buf = Vec::new();
        buf.extend_from_slice(&1.5f32.to_be_bytes());
        assert_eq!(decode_numeric_local(DataType::F32, &buf, false), vec![1.5]);

        assert_eq!(decode_numeric_local(DataType::I8, &[0xFF], true), vec![-1.0]);
    }
}
