use serde::{Deserialize, Serialize};

use super::field::ScalarField;
use super::tables::{EDGE_TABLE, TRI_TABLE};
use crate::geom::core::{Point3, Vec3};
use crate::geom::mesh::{Triangle, TriangleBatch, TriangleSink, TriangleSoup};

/// Default isolevel used by [`MarchingCubes::generate_geometry`].
pub const DEFAULT_ISOLATION: f64 = 80.0;

/// Default number of vertices buffered before a batch is flushed.
pub const DEFAULT_BATCH_CAPACITY: usize = 4096;

/// Smallest batch capacity that still holds one triangle after the
/// flush margin.
pub const MIN_BATCH_CAPACITY: usize = 6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarchingCubesError {
    #[error("isolation must be finite, got {0}")]
    NonFiniteIsolation(f64),
    #[error("batch capacity must be at least {min} vertices, got {actual}")]
    BatchCapacityTooSmall { min: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarchingCubesOptions {
    /// Field value separating inside from outside.
    pub isolation: f64,
    /// Vertices buffered per streamed batch.
    pub batch_capacity: usize,
}

impl Default for MarchingCubesOptions {
    fn default() -> Self {
        Self {
            isolation: DEFAULT_ISOLATION,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
        }
    }
}

impl MarchingCubesOptions {
    pub fn validate(&self) -> Result<(), MarchingCubesError> {
        if !self.isolation.is_finite() {
            return Err(MarchingCubesError::NonFiniteIsolation(self.isolation));
        }
        if self.batch_capacity < MIN_BATCH_CAPACITY {
            return Err(MarchingCubesError::BatchCapacityTooSmall {
                min: MIN_BATCH_CAPACITY,
                actual: self.batch_capacity,
            });
        }
        Ok(())
    }
}

/// Counters gathered during one [`MarchingCubes::extract_all`] sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub cubes_visited: usize,
    pub cubes_with_surface: usize,
    pub triangles: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

/// Corner offsets `(dx, dy, dz)` from the cube origin.
const CORNER_OFFSETS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (1, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (0, 1, 1),
    (1, 1, 1),
];

/// Classification bit set when the matching corner lies below the isolevel.
const CORNER_BITS: [usize; 8] = [1, 2, 8, 4, 16, 32, 128, 64];

/// Edge `e` runs from corner `.0` to corner `.1` along `.2`.
const EDGES: [(usize, usize, Axis); 12] = [
    (0, 1, Axis::X),
    (1, 3, Axis::Y),
    (2, 3, Axis::X),
    (0, 2, Axis::Y),
    (4, 5, Axis::X),
    (5, 7, Axis::Y),
    (6, 7, Axis::X),
    (4, 6, Axis::Y),
    (0, 4, Axis::Z),
    (1, 5, Axis::Z),
    (3, 7, Axis::Z),
    (2, 6, Axis::Z),
];

/// Marching-cubes isosurface extractor over a [`ScalarField`].
///
/// Extraction maps the grid onto the cube `[-1, 1]³`: sample `(x, y, z)`
/// sits at `((x - h) / h, (y - h) / h, (z - h) / h)` with `h = resolution / 2`.
/// Output is a non-indexed triangle stream; shared edge vertices are emitted
/// once per triangle.
#[derive(Debug, Clone)]
pub struct MarchingCubes {
    field: ScalarField,
    options: MarchingCubesOptions,
}

impl MarchingCubes {
    #[must_use]
    pub fn new(resolution: usize) -> Self {
        Self {
            field: ScalarField::new(resolution),
            options: MarchingCubesOptions::default(),
        }
    }

    pub fn with_options(
        resolution: usize,
        options: MarchingCubesOptions,
    ) -> Result<Self, MarchingCubesError> {
        options.validate()?;
        Ok(Self {
            field: ScalarField::new(resolution),
            options,
        })
    }

    /// Reallocates the field at a new resolution, discarding all samples.
    pub fn initialize(&mut self, resolution: usize) {
        log::debug!("marching cubes: initialize resolution {resolution}");
        self.field = ScalarField::new(resolution);
    }

    #[must_use]
    pub fn resolution(&self) -> usize {
        self.field.resolution()
    }

    #[must_use]
    pub fn options(&self) -> MarchingCubesOptions {
        self.options
    }

    #[must_use]
    pub fn isolation(&self) -> f64 {
        self.options.isolation
    }

    pub fn set_isolation(&mut self, isolation: f64) -> Result<(), MarchingCubesError> {
        let options = MarchingCubesOptions {
            isolation,
            ..self.options
        };
        options.validate()?;
        self.options = options;
        Ok(())
    }

    #[must_use]
    pub fn field(&self) -> &ScalarField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ScalarField {
        &mut self.field
    }

    pub fn reset(&mut self) {
        self.field.reset();
    }

    pub fn add_ball(&mut self, ball_x: f64, ball_y: f64, ball_z: f64, strength: f64, subtract: f64) {
        self.field.add_ball(ball_x, ball_y, ball_z, strength, subtract);
    }

    pub fn add_plane_x(&mut self, strength: f64, subtract: f64) {
        self.field.add_plane_x(strength, subtract);
    }

    pub fn add_plane_y(&mut self, strength: f64, subtract: f64) {
        self.field.add_plane_y(strength, subtract);
    }

    pub fn add_plane_z(&mut self, strength: f64, subtract: f64) {
        self.field.add_plane_z(strength, subtract);
    }

    /// Triangulates the cube whose lowest corner is sample `q`, located at
    /// `origin` in extraction space.
    ///
    /// Calls `emit` once per triangle and returns the number emitted. Cubes
    /// entirely on one side of `isolevel` emit nothing. `q` must not touch the
    /// outer shell: its gradient stencil reaches one sample beyond the cube.
    #[allow(clippy::cast_sign_loss)]
    pub fn polygonize<F>(&mut self, origin: Point3, q: usize, isolevel: f64, mut emit: F) -> usize
    where
        F: FnMut(Triangle),
    {
        let yd = self.field.yd();
        let zd = self.field.zd();
        let sample = |corner: usize| {
            let (dx, dy, dz) = CORNER_OFFSETS[corner];
            q + dx + dy * yd + dz * zd
        };

        let mut values = [0.0; 8];
        let mut cubeindex = 0usize;
        for (corner, value) in values.iter_mut().enumerate() {
            *value = self.field.value_at(sample(corner));
            if *value < isolevel {
                cubeindex |= CORNER_BITS[corner];
            }
        }

        let bits = EDGE_TABLE[cubeindex];
        if bits == 0 {
            return 0;
        }

        let d = self.field.delta();
        let corner_position = |corner: usize| {
            let (dx, dy, dz) = CORNER_OFFSETS[corner];
            Point3::new(
                if dx == 0 { origin.x } else { origin.x + d },
                if dy == 0 { origin.y } else { origin.y + d },
                if dz == 0 { origin.z } else { origin.z + d },
            )
        };

        let mut vlist = [Point3::ORIGIN; 12];
        let mut nlist = [Vec3::ZERO; 12];
        for (edge, &(start, end, axis)) in EDGES.iter().enumerate() {
            if bits & (1 << edge) == 0 {
                continue;
            }

            let (v1, v2) = (values[start], values[end]);
            let mu = (isolevel - v1) / (v2 - v1);
            let offset = mu * d;
            let p = corner_position(start);
            vlist[edge] = match axis {
                Axis::X => Point3::new(p.x + offset, p.y, p.z),
                Axis::Y => Point3::new(p.x, p.y + offset, p.z),
                Axis::Z => Point3::new(p.x, p.y, p.z + offset),
            };

            let n1 = self.field.gradient(sample(start));
            let n2 = self.field.gradient(sample(end));
            nlist[edge] = n1.lerp(n2, mu);
        }

        let mut emitted = 0;
        for tri in TRI_TABLE[cubeindex].chunks_exact(3) {
            if tri[0] < 0 {
                break;
            }
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            emit(Triangle::new(
                [vlist[a], vlist[b], vlist[c]],
                [nlist[a], nlist[b], nlist[c]],
            ));
            emitted += 1;
        }
        emitted
    }

    /// Sweeps every interior cube in x-fastest order and streams the
    /// triangles to `sink` in discovery order.
    ///
    /// A batch is flushed as soon as it holds `batch_capacity - 3` or more
    /// vertices; the remainder is flushed once the sweep ends. No welding is
    /// performed.
    pub fn extract_all<S>(&mut self, isolevel: f64, sink: &mut S) -> ExtractionStats
    where
        S: TriangleSink + ?Sized,
    {
        let size = self.field.resolution();
        let smin2 = size.saturating_sub(2);
        let half = self.field.halfsize();
        let flush_at = self.options.batch_capacity.saturating_sub(3).max(3);

        let mut stats = ExtractionStats::default();
        let mut batch = TriangleBatch::with_capacity(self.options.batch_capacity / 3);

        for z in 1..smin2 {
            let fz = (z as f64 - half) / half;
            for y in 1..smin2 {
                let fy = (y as f64 - half) / half;
                for x in 1..smin2 {
                    let fx = (x as f64 - half) / half;
                    let q = self.field.index(x, y, z);

                    let emitted = self.polygonize(Point3::new(fx, fy, fz), q, isolevel, |tri| {
                        batch.push(tri);
                        if batch.vertex_count() >= flush_at {
                            sink.accept(&batch);
                            batch.clear();
                            stats.batches += 1;
                        }
                    });

                    stats.cubes_visited += 1;
                    if emitted > 0 {
                        stats.cubes_with_surface += 1;
                        stats.triangles += emitted;
                    }
                }
            }
        }

        if !batch.is_empty() {
            sink.accept(&batch);
            stats.batches += 1;
        }

        log::debug!(
            "marching cubes: {} triangles from {}/{} cubes in {} batches",
            stats.triangles,
            stats.cubes_with_surface,
            stats.cubes_visited,
            stats.batches
        );
        stats
    }

    /// Extracts at the configured isolation and collects the triangles with
    /// unit-length normals.
    pub fn generate_geometry(&mut self) -> TriangleSoup {
        let mut soup = TriangleSoup::new();
        self.extract_all(self.options.isolation, &mut soup);
        soup.normalize_normals();
        soup
    }
}
