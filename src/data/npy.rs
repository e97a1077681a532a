//! Minimal NumPy `.npy` reader.
//!
//! Layout: magic `\x93NUMPY`, major/minor version bytes, header length
//! (u16 LE for v1, u32 LE for v2/v3), an ASCII Python dict literal with
//! `descr`, `fortran_order` and `shape`, then the raw array payload.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("not a .npy file (bad magic)")]
    BadMagic,
    #[error("unsupported .npy format version {0}.x")]
    UnsupportedVersion(u8),
    #[error("malformed .npy header: {0}")]
    MalformedHeader(String),
    #[error("unsupported .npy dtype '{0}'")]
    UnsupportedDtype(String),
    #[error("array payload holds {actual} bytes, shape needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Dtype
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl Scalar {
    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::F32 | Scalar::I32 | Scalar::U32 => 4,
            Scalar::F64 | Scalar::I64 | Scalar::U64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    scalar: Scalar,
    big_endian: bool,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        let unsupported = || NpyError::UnsupportedDtype(descr.to_string());

        let mut chars = descr.chars();
        let big_endian = match chars.next() {
            Some('<') | Some('|') => false,
            Some('>') => true,
            Some('=') => cfg!(target_endian = "big"),
            _ => return Err(unsupported()),
        };
        let scalar = match chars.as_str() {
            "f4" => Scalar::F32,
            "f8" => Scalar::F64,
            "i1" => Scalar::I8,
            "i2" => Scalar::I16,
            "i4" => Scalar::I32,
            "i8" => Scalar::I64,
            "u1" => Scalar::U8,
            "u2" => Scalar::U16,
            "u4" => Scalar::U32,
            "u8" => Scalar::U64,
            _ => return Err(unsupported()),
        };
        Ok(Dtype { scalar, big_endian })
    }

    fn decode(self, bytes: &[u8]) -> Vec<f32> {
        if self.big_endian {
            decode_with::<BigEndian>(self.scalar, bytes)
        } else {
            decode_with::<LittleEndian>(self.scalar, bytes)
        }
    }
}

fn decode_with<B: ByteOrder>(scalar: Scalar, bytes: &[u8]) -> Vec<f32> {
    let chunks = bytes.chunks_exact(scalar.size());
    match scalar {
        Scalar::F32 => chunks.map(B::read_f32).collect(),
        Scalar::F64 => chunks.map(|c| B::read_f64(c) as f32).collect(),
        Scalar::I8 => chunks.map(|c| c[0] as i8 as f32).collect(),
        Scalar::I16 => chunks.map(|c| B::read_i16(c) as f32).collect(),
        Scalar::I32 => chunks.map(|c| B::read_i32(c) as f32).collect(),
        Scalar::I64 => chunks.map(|c| B::read_i64(c) as f32).collect(),
        Scalar::U8 => chunks.map(|c| c[0] as f32).collect(),
        Scalar::U16 => chunks.map(|c| B::read_u16(c) as f32).collect(),
        Scalar::U32 => chunks.map(|c| B::read_u32(c) as f32).collect(),
        Scalar::U64 => chunks.map(|c| B::read_u64(c) as f32).collect(),
    }
}

// ---------------------------------------------------------------------------
// NpyArray
// ---------------------------------------------------------------------------

/// A decoded array, every element widened or narrowed to `f32`.
#[derive(Debug, Clone)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub fortran_order: bool,
    pub values: Vec<f32>,
}

impl NpyArray {
    /// Element at `(row, col)` of a 2-D array, honouring memory order.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let (rows, cols) = (self.shape[0], self.shape[1]);
        if self.fortran_order {
            self.values[col * rows + row]
        } else {
            self.values[row * cols + col]
        }
    }
}

/// Format a shape the way NumPy prints tuples: `(5,)`, `(5, 3)`, `()`.
pub fn shape_string(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let inner: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", inner.join(", "))
        }
    }
}

/// Read a complete `.npy` stream.
pub fn read_npy<R: Read>(mut reader: R) -> Result<NpyArray, NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(|_| NpyError::BadMagic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        v => return Err(NpyError::UnsupportedVersion(v)),
    };

    let mut header = Vec::new();
    reader.by_ref().take(header_len as u64).read_to_end(&mut header)?;
    if header.len() < header_len {
        return Err(NpyError::MalformedHeader(format!(
            "header declares {header_len} bytes, file ends after {}",
            header.len()
        )));
    }
    let header = String::from_utf8_lossy(&header);

    let descr = parse_quoted(dict_value(&header, "descr")?)?;
    let dtype = Dtype::parse(&descr)?;
    let fortran_order = dict_value(&header, "fortran_order")?.starts_with("True");
    let shape = parse_shape(dict_value(&header, "shape")?)?;

    let expected = shape
        .iter()
        .try_fold(dtype.scalar.size(), |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            NpyError::MalformedHeader(format!("shape {} is too large", shape_string(&shape)))
        })?;

    // Grows with the bytes actually present.
    let mut payload = Vec::new();
    reader.take(expected as u64).read_to_end(&mut payload)?;
    if payload.len() < expected {
        return Err(NpyError::SizeMismatch {
            expected,
            actual: payload.len(),
        });
    }

    Ok(NpyArray {
        shape,
        fortran_order,
        values: dtype.decode(&payload),
    })
}

// -- header dict helpers --

/// Slice of the header right after `'key':`, leading whitespace trimmed.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let needle_single = format!("'{key}'");
    let needle_double = format!("\"{key}\"");
    let (start, needle_len) = header
        .find(&needle_single)
        .map(|i| (i, needle_single.len()))
        .or_else(|| header.find(&needle_double).map(|i| (i, needle_double.len())))
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing key '{key}'")))?;

    let rest = header[start + needle_len..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::MalformedHeader(format!("no ':' after '{key}'")))?;
    Ok(rest.trim_start())
}

fn parse_quoted(value: &str) -> Result<String, NpyError> {
    let quote = value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::MalformedHeader("descr is not a string".into()))?;
    let body = &value[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| NpyError::MalformedHeader("unterminated descr string".into()))?;
    Ok(body[..end].to_string())
}

fn parse_shape(value: &str) -> Result<Vec<usize>, NpyError> {
    let body = value
        .strip_prefix('(')
        .and_then(|v| v.find(')').map(|end| &v[..end]))
        .ok_or_else(|| NpyError::MalformedHeader("shape is not a tuple".into()))?;

    body.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            // Python 2 writers emit long literals such as `10L`.
            tok.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("bad shape dimension '{tok}'")))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Encode a version 1.0 `.npy` file around an already serialised payload.
///
/// `descr` is written verbatim, so it must match how `payload` was encoded.
pub fn encode_npy(descr: &str, fortran_order: bool, shape: &[usize], payload: &[u8]) -> Vec<u8> {
    let order = if fortran_order { "True" } else { "False" };
    let mut dict = format!(
        "{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {}, }}",
        shape_string(shape)
    );
    // Pad so that magic + version + len + header is a multiple of 64, ending in '\n'.
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    dict.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    dict.push('\n');

    let mut out = Vec::with_capacity(dict.len() + 10 + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_payload(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn reads_c_ordered_float32() {
        let bytes = encode_npy("<f4", false, &[2, 3], &f32_payload(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let arr = read_npy(bytes.as_slice()).unwrap();
        assert_eq!(arr.shape, vec![2, 3]);
        assert_eq!(arr.get(1, 0), 4.0);
        assert_eq!(arr.get(0, 2), 3.0);
    }

    #[test]
    fn reads_fortran_ordered_array() {
        // Column-major storage of [[1, 2, 3], [4, 5, 6]].
        let bytes = encode_npy("<f4", true, &[2, 3], &f32_payload(&[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]));
        let arr = read_npy(bytes.as_slice()).unwrap();
        assert_eq!(arr.get(1, 0), 4.0);
        assert_eq!(arr.get(0, 2), 3.0);
    }

    #[test]
    fn reads_big_endian_float64() {
        let payload: Vec<u8> = [1.5f64, -2.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = encode_npy(">f8", false, &[2], &payload);
        let arr = read_npy(bytes.as_slice()).unwrap();
        assert_eq!(arr.values, vec![1.5, -2.0]);
    }

    #[test]
    fn header_is_padded_to_64_bytes() {
        let bytes = encode_npy("<f4", false, &[0, 3], &[]);
        assert_eq!(bytes.len() % 64, 0);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = read_npy(&b"NOTNPY\x01\x00"[..]).unwrap_err();
        assert!(matches!(err, NpyError::BadMagic));
    }

    #[test]
    fn rejects_unsupported_dtype() {
        let bytes = encode_npy("<c16", false, &[1], &[0; 16]);
        let err = read_npy(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NpyError::UnsupportedDtype(d) if d == "<c16"));
    }

    #[test]
    fn rejects_short_payload() {
        let bytes = encode_npy("<f4", false, &[4, 3], &f32_payload(&[1.0, 2.0]));
        let err = read_npy(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NpyError::SizeMismatch { expected: 48, actual: 8 }));
    }

    #[test]
    fn overflowing_shape_is_malformed() {
        let bytes = encode_npy("<f4", false, &[4_611_686_018_427_387_904, 4], &[]);
        let err = read_npy(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NpyError::MalformedHeader(m) if m.contains("too large")));
    }

    #[test]
    fn huge_claimed_payload_reports_actual_size() {
        // Fits in usize, but the file only carries one float.
        let bytes = encode_npy("<f8", false, &[1 << 40, 3], &1.0f64.to_le_bytes());
        let err = read_npy(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NpyError::SizeMismatch { actual: 8, .. }));
    }

    #[test]
    fn header_longer_than_file_is_malformed() {
        let mut bytes = b"\x93NUMPY\x02\x00".to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(b"{'descr': '<f4'");
        let err = read_npy(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NpyError::MalformedHeader(_)));
    }

    #[test]
    fn reads_integer_dtypes() {
        let payload: Vec<u8> = [-3i16, 7].iter().flat_map(|v| v.to_be_bytes()).collect();
        let arr = read_npy(encode_npy(">i2", false, &[2], &payload).as_slice()).unwrap();
        assert_eq!(arr.values, vec![-3.0, 7.0]);

        let arr = read_npy(encode_npy("|u1", false, &[3], &[0, 128, 255]).as_slice()).unwrap();
        assert_eq!(arr.values, vec![0.0, 128.0, 255.0]);
    }

    #[test]
    fn shapes_print_like_numpy() {
        assert_eq!(shape_string(&[]), "()");
        assert_eq!(shape_string(&[7]), "(7,)");
        assert_eq!(shape_string(&[7, 2]), "(7, 2)");
    }
}
