use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use pcd_rs::{DynReader, Field};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use thiserror::Error;

use super::model::PointCloud;
use super::npy::{self, NpyError};

/// Bytes per KITTI point: x, y, z, intensity as little-endian float32.
const KITTI_POINT_BYTES: usize = 16;

/// Format-level failures. Wrapped in [`anyhow::Error`] together with the file context.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("File is empty or corrupted.")]
    Empty,
    #[error("KITTI .bin file has {len} bytes, not a multiple of {KITTI_POINT_BYTES} (x, y, z, intensity as float32)")]
    TruncatedBin { len: usize },
    #[error("Invalid shape {0} for point cloud. Expected (N, 3+)")]
    InvalidShape(String),
    #[error("missing '{0}' field")]
    MissingField(String),
    #[error(transparent)]
    Npy(#[from] NpyError),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a point cloud from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.pcd` – PCL point cloud data (ascii, binary)
/// * `.ply` – Stanford polygon file, `vertex` element with `x`, `y`, `z`
/// * `.xyz` – text, one `x y z` triple per line
/// * `.bin` – KITTI velodyne scan, headerless float32 `x y z intensity`
/// * `.npy` – NumPy array of shape `(N, 3+)`
///
/// A file that parses to zero points is reported as [`LoadError::Empty`].
pub fn load_file(path: &Path) -> Result<PointCloud> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let cloud = match ext.as_str() {
        "pcd" => load_pcd(path),
        "ply" => load_ply(path),
        "xyz" => load_xyz(path),
        "bin" => load_kitti_bin(path),
        "npy" => load_npy(path),
        "" => Err(LoadError::UnsupportedFormat("(no extension)".into()).into()),
        other => Err(LoadError::UnsupportedFormat(format!(".{other}")).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    if cloud.is_empty() {
        return Err(
            anyhow::Error::new(LoadError::Empty).context(format!("loading {}", path.display()))
        );
    }
    Ok(cloud)
}

// ---------------------------------------------------------------------------
// PCD loader
// ---------------------------------------------------------------------------

/// Fields are located by name, so `x y z` need not be the leading columns.
/// An `intensity` field is picked up when present.
fn load_pcd(path: &Path) -> Result<PointCloud> {
    let reader = DynReader::open(path).context("opening PCD file")?;

    let fields = &reader.meta().field_defs.fields;
    let position = |name: &str| fields.iter().position(|f| f.name.eq_ignore_ascii_case(name));
    let require = |name: &str| position(name).ok_or_else(|| LoadError::MissingField(name.into()));

    let xyz_idx = [require("x")?, require("y")?, require("z")?];
    let intensity_idx = position("intensity");
    log::debug!(
        "PCD fields {:?}",
        fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
    );

    let mut points = Vec::new();
    let mut intensity = Vec::new();

    for (i, record) in reader.enumerate() {
        let record = record.with_context(|| format!("reading PCD point {i}"))?;
        let value = |idx: usize| {
            record
                .0
                .get(idx)
                .and_then(pcd_field_value)
                .with_context(|| format!("PCD point {i}: unreadable field #{idx}"))
        };

        points.push([value(xyz_idx[0])?, value(xyz_idx[1])?, value(xyz_idx[2])?]);
        if let Some(idx) = intensity_idx {
            intensity.push(value(idx)?);
        }
    }

    let cloud = PointCloud::new(points);
    Ok(match intensity_idx {
        Some(_) => cloud.with_intensity(intensity),
        None => cloud,
    })
}

/// First element of a PCD field as `f32`.
fn pcd_field_value(field: &Field) -> Option<f32> {
    match field {
        Field::I8(v) => v.first().map(|&x| x as f32),
        Field::I16(v) => v.first().map(|&x| x as f32),
        Field::I32(v) => v.first().map(|&x| x as f32),
        Field::U8(v) => v.first().map(|&x| x as f32),
        Field::U16(v) => v.first().map(|&x| x as f32),
        Field::U32(v) => v.first().map(|&x| x as f32),
        Field::F32(v) => v.first().copied(),
        Field::F64(v) => v.first().map(|&x| x as f32),
    }
}

// ---------------------------------------------------------------------------
// PLY loader
// ---------------------------------------------------------------------------

/// Property names recognised as intensity, in priority order.
const PLY_INTENSITY_NAMES: [&str; 2] = ["intensity", "scalar_intensity"];

/// Reads the `vertex` element; faces and other elements are ignored.
fn load_ply(path: &Path) -> Result<PointCloud> {
    let file = File::open(path).context("opening PLY file")?;
    let mut reader = BufReader::new(file);
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader).context("parsing PLY")?;

    let Some(vertices) = ply.payload.get("vertex") else {
        return Ok(PointCloud::new(Vec::new()));
    };

    let intensity_name = vertices.first().and_then(|v| {
        PLY_INTENSITY_NAMES
            .iter()
            .copied()
            .find(|name| v.contains_key(*name))
    });

    let mut points = Vec::with_capacity(vertices.len());
    let mut intensity = Vec::new();

    for (i, vertex) in vertices.iter().enumerate() {
        let value = |name: &str| -> Result<f32> {
            let prop = vertex
                .get(name)
                .ok_or_else(|| LoadError::MissingField(name.into()))?;
            ply_property_value(prop)
                .with_context(|| format!("PLY vertex {i}: '{name}' is not a scalar"))
        };

        points.push([value("x")?, value("y")?, value("z")?]);
        if let Some(name) = intensity_name {
            intensity.push(value(name)?);
        }
    }

    let cloud = PointCloud::new(points);
    Ok(match intensity_name {
        Some(_) => cloud.with_intensity(intensity),
        None => cloud,
    })
}

fn ply_property_value(prop: &Property) -> Option<f32> {
    match *prop {
        Property::Char(x) => Some(x as f32),
        Property::UChar(x) => Some(x as f32),
        Property::Short(x) => Some(x as f32),
        Property::UShort(x) => Some(x as f32),
        Property::Int(x) => Some(x as f32),
        Property::UInt(x) => Some(x as f32),
        Property::Float(x) => Some(x),
        Property::Double(x) => Some(x as f32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// XYZ loader
// ---------------------------------------------------------------------------

fn load_xyz(path: &Path) -> Result<PointCloud> {
    let file = File::open(path).context("opening XYZ file")?;
    parse_xyz(BufReader::new(file))
}

/// One point per line: the first three whitespace-separated numbers.
/// Trailing columns are ignored; lines without three leading numbers are skipped.
fn parse_xyz<R: BufRead>(reader: R) -> Result<PointCloud> {
    let mut points = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading XYZ line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let mut coords = line.split_whitespace().map(str::parse::<f32>);
        match (coords.next(), coords.next(), coords.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => points.push([x, y, z]),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} XYZ line(s) without three leading numbers");
    }
    Ok(PointCloud::new(points))
}

// ---------------------------------------------------------------------------
// KITTI .bin loader
// ---------------------------------------------------------------------------

fn load_kitti_bin(path: &Path) -> Result<PointCloud> {
    let bytes = std::fs::read(path).context("reading KITTI .bin file")?;
    Ok(parse_kitti_bin(&bytes)?)
}

fn parse_kitti_bin(bytes: &[u8]) -> Result<PointCloud, LoadError> {
    if bytes.len() % KITTI_POINT_BYTES != 0 {
        return Err(LoadError::TruncatedBin { len: bytes.len() });
    }

    let mut values = vec![0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(bytes, &mut values);

    let (points, intensity): (Vec<[f32; 3]>, Vec<f32>) = values
        .chunks_exact(4)
        .map(|c| ([c[0], c[1], c[2]], c[3]))
        .unzip();

    Ok(PointCloud::new(points).with_intensity(intensity))
}

// ---------------------------------------------------------------------------
// NumPy loader
// ---------------------------------------------------------------------------

/// Columns 0..3 are x, y, z. A fourth column, when present, is read as intensity.
fn load_npy(path: &Path) -> Result<PointCloud> {
    let file = File::open(path).context("opening .npy file")?;
    let array = npy::read_npy(BufReader::new(file)).map_err(LoadError::from)?;

    let (rows, cols) = match array.shape.as_slice() {
        &[rows, cols] if cols >= 3 => (rows, cols),
        shape => return Err(LoadError::InvalidShape(npy::shape_string(shape)).into()),
    };

    let points = (0..rows)
        .map(|r| [array.get(r, 0), array.get(r, 1), array.get(r, 2)])
        .collect();
    let cloud = PointCloud::new(points);

    if cols >= 4 {
        let intensity = (0..rows).map(|r| array.get(r, 3)).collect();
        Ok(cloud.with_intensity(intensity))
    } else {
        Ok(cloud)
    }
}
