use glam::Vec3;

// ---------------------------------------------------------------------------
// Bounds – axis-aligned box around the finite points
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box of a point cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Compute bounds over all finite points. Returns `None` when no point is finite.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let mut finite = points
            .iter()
            .map(|&p| Vec3::from(p))
            .filter(|p| p.is_finite());

        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Bounds { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the bounding sphere around [`Self::center`].
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() * 0.5
    }
}

// ---------------------------------------------------------------------------
// PointCloud – the normalised in-memory scan
// ---------------------------------------------------------------------------

/// A loaded scan: N×3 coordinates, optional intensity, pre-computed bounds.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// Point coordinates (x, y, z).
    pub points: Vec<[f32; 3]>,
    /// Per-point intensity – same length as `points` when present.
    pub intensity: Option<Vec<f32>>,
    /// `None` when the cloud has no finite point.
    pub bounds: Option<Bounds>,
}

impl PointCloud {
    pub fn new(points: Vec<[f32; 3]>) -> Self {
        let bounds = Bounds::from_points(&points);
        PointCloud {
            points,
            intensity: None,
            bounds,
        }
    }

    /// Attach an intensity channel. Ignored if its length doesn't match.
    pub fn with_intensity(mut self, intensity: Vec<f32>) -> Self {
        if intensity.len() == self.points.len() {
            self.intensity = Some(intensity);
        } else {
            log::warn!(
                "Dropping intensity channel: {} values for {} points",
                intensity.len(),
                self.points.len()
            );
        }
        self
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_intensity(&self) -> bool {
        self.intensity.is_some()
    }

    /// Z coordinate of every point, the scalar used for height colouring.
    pub fn heights(&self) -> Vec<f32> {
        self.points.iter().map(|p| p[2]).collect()
    }
}
