//! Writes one synthetic LiDAR sweep in every supported format.
//!
//! The scene is a spinning multi-beam sensor 1.73 m above flat ground,
//! surrounded by a wavy wall with a single pole in front of it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use clap::Parser;
use lidar_viewer::data::npy;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;

const SENSOR_HEIGHT: f64 = 1.73;
const MAX_RANGE: f64 = 80.0;
const POLE_CENTER: (f64, f64) = (8.0, 3.0);
const POLE_RADIUS: f64 = 0.5;

/// Generate sample scans (.pcd, .ply, .xyz, .bin, .npy) for the viewer.
#[derive(Debug, Parser)]
struct Args {
    /// Output directory, created if missing.
    #[arg(default_value = "sample_scans")]
    out_dir: PathBuf,

    /// Number of laser beams.
    #[arg(long, default_value_t = 32)]
    rings: usize,

    /// Firings per revolution.
    #[arg(long, default_value_t = 1024)]
    columns: usize,

    /// Seed for the range noise.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// One return: x, y, z, intensity.
type Return = [f32; 4];

/// Range to the nearest surface along the ray, with that surface's reflectivity.
fn cast(dir: [f64; 3], azimuth: f64) -> Option<(f64, f64)> {
    let mut hits: Vec<(f64, f64)> = Vec::with_capacity(3);

    // Ground plane.
    if dir[2] < 0.0 {
        hits.push((-SENSOR_HEIGHT / dir[2], 0.25));
    }

    // Wavy wall around the sensor.
    let horizontal = dir[0].hypot(dir[1]);
    if horizontal > 1e-9 {
        let wall_radius = 25.0 + 5.0 * (3.0 * azimuth).sin();
        hits.push((wall_radius / horizontal, 0.6));
    }

    // Pole: ray/circle intersection in the xy plane.
    let (cx, cy) = POLE_CENTER;
    let a = dir[0] * dir[0] + dir[1] * dir[1];
    let b = -2.0 * (dir[0] * cx + dir[1] * cy);
    let c = cx * cx + cy * cy - POLE_RADIUS * POLE_RADIUS;
    let disc = b * b - 4.0 * a * c;
    if a > 1e-9 && disc >= 0.0 {
        hits.push(((-b - disc.sqrt()) / (2.0 * a), 0.95));
    }

    hits.into_iter()
        .filter(|&(t, _)| t > 0.0 && t <= MAX_RANGE)
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

fn simulate_sweep(rings: usize, columns: usize, rng: &mut SimpleRng) -> Vec<Return> {
    let (lowest, highest) = (-25.0f64.to_radians(), 3.0f64.to_radians());
    let mut returns = Vec::with_capacity(rings * columns);

    for ring in 0..rings {
        let t = ring as f64 / (rings.max(2) - 1) as f64;
        let elevation = lowest + t * (highest - lowest);
        let (sin_el, cos_el) = elevation.sin_cos();

        for col in 0..columns {
            let azimuth = col as f64 / columns as f64 * std::f64::consts::TAU;
            let (sin_az, cos_az) = azimuth.sin_cos();
            let dir = [cos_el * cos_az, cos_el * sin_az, sin_el];

            let Some((range, reflectivity)) = cast(dir, azimuth) else {
                continue;
            };
            let range = range + rng.gauss(0.0, 0.02);
            let intensity = (reflectivity * (1.0 - range / (2.0 * MAX_RANGE))
                + rng.gauss(0.0, 0.02))
            .clamp(0.0, 1.0);

            returns.push([
                (dir[0] * range) as f32,
                (dir[1] * range) as f32,
                (dir[2] * range) as f32,
                intensity as f32,
            ]);
        }
    }
    returns
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_kitti_bin(path: &Path, returns: &[Return]) -> Result<()> {
    let mut w = create(path)?;
    for &value in returns.iter().flatten() {
        w.write_f32::<LittleEndian>(value)?;
    }
    w.flush()?;
    Ok(())
}

fn write_xyz(path: &Path, returns: &[Return]) -> Result<()> {
    let mut w = create(path)?;
    for [x, y, z, _] in returns {
        writeln!(w, "{x:.4} {y:.4} {z:.4}")?;
    }
    w.flush()?;
    Ok(())
}

fn write_pcd(path: &Path, returns: &[Return]) -> Result<()> {
    let mut w = create(path)?;
    let n = returns.len();
    writeln!(w, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(w, "VERSION 0.7")?;
    writeln!(w, "FIELDS x y z intensity")?;
    writeln!(w, "SIZE 4 4 4 4")?;
    writeln!(w, "TYPE F F F F")?;
    writeln!(w, "COUNT 1 1 1 1")?;
    writeln!(w, "WIDTH {n}")?;
    writeln!(w, "HEIGHT 1")?;
    writeln!(w, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(w, "POINTS {n}")?;
    writeln!(w, "DATA ascii")?;
    for [x, y, z, i] in returns {
        writeln!(w, "{x} {y} {z} {i}")?;
    }
    w.flush()?;
    Ok(())
}

fn write_ply(path: &Path, returns: &[Return]) -> Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::BinaryLittleEndian;
    ply.header
        .comments
        .push("Synthetic sweep from generate_sample".to_string());

    let mut vertex = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z", "intensity"] {
        vertex.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    vertex.count = returns.len();
    ply.header.elements.add(vertex);

    let vertices = returns
        .iter()
        .map(|r| {
            let mut v = DefaultElement::new();
            for (name, value) in ["x", "y", "z", "intensity"].iter().zip(r) {
                v.insert(name.to_string(), Property::Float(*value));
            }
            v
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let mut w = create(path)?;
    Writer::new()
        .write_ply(&mut w, &mut ply)
        .with_context(|| format!("writing {}", path.display()))?;
    w.flush()?;
    Ok(())
}

/// Little-endian float32, shape `(N, 4)`.
fn write_npy(path: &Path, returns: &[Return]) -> Result<()> {
    let payload: Vec<u8> = returns
        .iter()
        .flatten()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let bytes = npy::encode_npy("<f4", false, &[returns.len(), 4], &payload);
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut rng = SimpleRng::new(args.seed);
    let returns = simulate_sweep(args.rings, args.columns, &mut rng);

    let dir = &args.out_dir;
    write_pcd(&dir.join("sweep.pcd"), &returns)?;
    write_ply(&dir.join("sweep.ply"), &returns)?;
    write_xyz(&dir.join("sweep.xyz"), &returns)?;
    write_kitti_bin(&dir.join("000000.bin"), &returns)?;
    write_npy(&dir.join("sweep.npy"), &returns)?;

    log::info!(
        "Wrote {} points ({} rings × {} columns) in 5 formats to {}",
        returns.len(),
        args.rings,
        args.columns,
        dir.display()
    );
    Ok(())
}
