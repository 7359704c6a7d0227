//! World-space metaball host over [`MarchingCubes`].
//!
//! Balls are given as world positions inside the cube `[-size, size]³`. They
//! are mapped into the normalized grid, summed into the scalar field, and the
//! extracted surface is scaled back to world units and welded.

use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance};
use super::diagnostics::GeomMeshDiagnostics;
use super::marching_cubes::{MarchingCubes, MarchingCubesError, MarchingCubesOptions};
use super::mesh::GeomMesh;
use super::metrics::{GeomMetrics, TimingBucket};

/// Grid resolutions below this hold no interior cubes.
pub const MIN_RESOLUTION: usize = 4;

/// Largest accepted grid resolution; keeps the `resolution³` sample count
/// and its gradient buffer allocatable on 32-bit targets.
pub const MAX_RESOLUTION: usize = 256;

/// Ball strength per unit of `ball_size`.
const STRENGTH_PER_BALL_SIZE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetaballError {
    #[error("resolution must be at least {min}, got {actual}")]
    ResolutionTooSmall { min: usize, actual: usize },
    #[error("resolution must be at most {max}, got {actual}")]
    ResolutionTooLarge { max: usize, actual: usize },
    #[error("{name} must be finite and positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error(transparent)]
    MarchingCubes(#[from] MarchingCubesError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaballOptions {
    /// Samples per grid axis.
    pub resolution: usize,
    /// Half extent of the world cube covered by the grid.
    pub size: f64,
    /// Scales the strength of every ball.
    pub ball_size: f64,
    /// Falloff offset; larger values shrink each ball's reach.
    pub subtract: f64,
    /// Isolevel of the extracted surface.
    pub isolation: f64,
}

impl Default for MetaballOptions {
    fn default() -> Self {
        Self {
            resolution: 100,
            size: 500.0,
            ball_size: 1.0,
            subtract: 10.0,
            isolation: 80.0,
        }
    }
}

impl MetaballOptions {
    pub fn validate(&self) -> Result<(), MetaballError> {
        if self.resolution < MIN_RESOLUTION {
            return Err(MetaballError::ResolutionTooSmall {
                min: MIN_RESOLUTION,
                actual: self.resolution,
            });
        }
        if self.resolution > MAX_RESOLUTION {
            return Err(MetaballError::ResolutionTooLarge {
                max: MAX_RESOLUTION,
                actual: self.resolution,
            });
        }
        for (name, value) in [
            ("size", self.size),
            ("ballSize", self.ball_size),
            ("subtract", self.subtract),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MetaballError::InvalidParameter { name, value });
            }
        }
        self.marching_cubes_options().validate()?;
        Ok(())
    }

    /// Strength handed to [`MarchingCubes::add_ball`] for every ball.
    #[must_use]
    pub fn strength(&self) -> f64 {
        self.ball_size * STRENGTH_PER_BALL_SIZE
    }

    fn marching_cubes_options(&self) -> MarchingCubesOptions {
        MarchingCubesOptions {
            isolation: self.isolation,
            ..MarchingCubesOptions::default()
        }
    }
}

/// Blobby surface around a set of world-space points.
#[derive(Debug)]
pub struct MetaballScene {
    options: MetaballOptions,
    cubes: MarchingCubes,
    ball_count: usize,
    metrics: GeomMetrics,
    /// Time spent building the current field, reported with every extraction.
    field_accumulation_ns: u64,
}

impl MetaballScene {
    pub fn new(options: MetaballOptions) -> Result<Self, MetaballError> {
        options.validate()?;
        let cubes = MarchingCubes::with_options(options.resolution, options.marching_cubes_options())?;
        Ok(Self {
            options,
            cubes,
            ball_count: 0,
            metrics: GeomMetrics::default(),
            field_accumulation_ns: 0,
        })
    }

    #[must_use]
    pub fn options(&self) -> MetaballOptions {
        self.options
    }

    /// Number of balls in the current field.
    #[must_use]
    pub fn ball_count(&self) -> usize {
        self.ball_count
    }

    #[must_use]
    pub fn marching_cubes(&self) -> &MarchingCubes {
        &self.cubes
    }

    /// Reallocates the grid; the field is empty until the next
    /// [`update_balls`](Self::update_balls).
    pub fn set_resolution(&mut self, resolution: usize) -> Result<(), MetaballError> {
        let options = MetaballOptions {
            resolution,
            ..self.options
        };
        options.validate()?;
        self.options = options;
        self.cubes.initialize(resolution);
        self.ball_count = 0;
        self.field_accumulation_ns = 0;
        Ok(())
    }

    /// Grid-space position of a world point; `[-size, size]` maps to `[0, 1]`.
    #[must_use]
    pub fn to_grid(&self, p: Point3) -> Point3 {
        let size = self.options.size;
        let span = 2.0 * size;
        Point3::new((p.x + size) / span, (p.y + size) / span, (p.z + size) / span)
    }

    /// Rebuilds the field from scratch with one ball per point.
    pub fn update_balls(&mut self, points: &[Point3]) {
        self.metrics.begin();
        let strength = self.options.strength();
        let subtract = self.options.subtract;
        let grid: Vec<Point3> = points.iter().map(|p| self.to_grid(*p)).collect();

        let cubes = &mut self.cubes;
        self.metrics.time(TimingBucket::FieldAccumulation, || {
            cubes.reset();
            for g in &grid {
                cubes.add_ball(g.x, g.y, g.z, strength, subtract);
            }
        });
        self.field_accumulation_ns = self
            .metrics
            .end()
            .map_or(0, |report| report.field_accumulation_ns);
        self.ball_count = points.len();
        log::debug!("metaballs: {} balls at resolution {}", points.len(), self.options.resolution);
    }

    /// Extracts the current field, scales it to world units and welds
    /// coincident vertices.
    ///
    /// Triangles dropped while welding are reported as degenerate. The timing
    /// report covers this call plus the field build it extracted from.
    pub fn generate_mesh(&mut self) -> (GeomMesh, GeomMeshDiagnostics) {
        self.metrics.begin();
        let size = self.options.size;
        let tol = Tolerance::WELD.scaled(size);

        let cubes = &mut self.cubes;
        let mut soup = self
            .metrics
            .time(TimingBucket::Extraction, || cubes.generate_geometry());
        soup.scale(size);

        let (mesh, welded) = self.metrics.time(TimingBucket::Welding, || soup.weld(tol));
        let dropped = soup.len() - mesh.triangle_count();

        let mut diagnostics = self
            .metrics
            .time(TimingBucket::Diagnostics, || GeomMeshDiagnostics::from_mesh(&mesh, tol));
        diagnostics.welded_vertex_count = welded;
        diagnostics.degenerate_triangle_count += dropped;
        let field_ns = self.field_accumulation_ns;
        diagnostics.timing = self.metrics.end().map(|mut report| {
            report.add(TimingBucket::FieldAccumulation, field_ns);
            report
        });

        log::debug!("metaballs: {}", diagnostics.summary());
        (mesh, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_options() -> MetaballOptions {
        MetaballOptions {
            resolution: 24,
            ..MetaballOptions::default()
        }
    }

    #[test]
    fn test_defaults() {
        let options = MetaballOptions::default();
        assert_eq!(options.resolution, 100);
        assert_eq!(options.size, 500.0);
        assert!((options.strength() - 0.005).abs() < 1e-15);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let too_small = MetaballOptions {
            resolution: 3,
            ..MetaballOptions::default()
        };
        assert_eq!(
            too_small.validate(),
            Err(MetaballError::ResolutionTooSmall { min: 4, actual: 3 })
        );

        let zero_subtract = MetaballOptions {
            subtract: 0.0,
            ..MetaballOptions::default()
        };
        assert!(matches!(
            zero_subtract.validate(),
            Err(MetaballError::InvalidParameter { name: "subtract", .. })
        ));

        let nan_iso = MetaballOptions {
            isolation: f64::NAN,
            ..MetaballOptions::default()
        };
        assert!(matches!(nan_iso.validate(), Err(MetaballError::MarchingCubes(_))));
    }

    #[test]
    fn test_oversized_resolution_is_rejected() {
        let huge = MetaballOptions {
            resolution: 3_000_000,
            ..MetaballOptions::default()
        };
        let expected = MetaballError::ResolutionTooLarge {
            max: MAX_RESOLUTION,
            actual: 3_000_000,
        };
        assert_eq!(huge.validate(), Err(expected.clone()));
        assert_eq!(MetaballScene::new(huge).unwrap_err(), expected);
        assert!(expected.to_string().contains("at most 256"));

        let largest = MetaballOptions {
            resolution: MAX_RESOLUTION,
            ..MetaballOptions::default()
        };
        assert!(largest.validate().is_ok());

        let mut scene = MetaballScene::new(small_options()).unwrap();
        assert_eq!(
            scene.set_resolution(MAX_RESOLUTION + 1),
            Err(MetaballError::ResolutionTooLarge {
                max: MAX_RESOLUTION,
                actual: MAX_RESOLUTION + 1,
            })
        );
        assert_eq!(scene.options().resolution, 24);
        assert_eq!(scene.marching_cubes().resolution(), 24);
    }

    #[test]
    fn test_world_to_grid_mapping() {
        let scene = MetaballScene::new(small_options()).unwrap();
        assert_eq!(scene.to_grid(Point3::ORIGIN), Point3::new(0.5, 0.5, 0.5));
        assert_eq!(scene.to_grid(Point3::new(-500.0, 500.0, 250.0)), Point3::new(0.0, 1.0, 0.75));
    }

    #[test]
    fn test_empty_scene_yields_empty_mesh() {
        let mut scene = MetaballScene::new(small_options()).unwrap();
        scene.update_balls(&[]);
        let (mesh, diagnostics) = scene.generate_mesh();
        assert!(mesh.is_empty());
        assert_eq!(diagnostics.triangle_count, 0);
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn test_set_resolution_clears_balls() {
        let mut scene = MetaballScene::new(small_options()).unwrap();
        scene.update_balls(&[Point3::ORIGIN]);
        assert_eq!(scene.ball_count(), 1);
        scene.set_resolution(16).unwrap();
        assert_eq!(scene.ball_count(), 0);
        assert_eq!(scene.marching_cubes().resolution(), 16);
        assert!(scene.set_resolution(2).is_err());
        assert_eq!(scene.options().resolution, 16);
    }

    #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
    #[test]
    fn test_timing_report_covers_one_extraction() {
        let mut scene = MetaballScene::new(MetaballOptions {
            resolution: 64,
            ball_size: 30.0,
            ..MetaballOptions::default()
        })
        .unwrap();
        scene.update_balls(&[Point3::new(-40.0, 0.0, 0.0), Point3::new(40.0, 0.0, 0.0)]);
        let (_, first) = scene.generate_mesh();
        let first = first.timing.unwrap();

        // a second extraction of the same field reports the same field build
        let (_, again) = scene.generate_mesh();
        let again = again.timing.unwrap();
        assert_eq!(again.field_accumulation_ns, first.field_accumulation_ns);

        // one interior cube extracts far faster than the 64³ grid did
        scene.set_resolution(MIN_RESOLUTION).unwrap();
        let (mesh, small) = scene.generate_mesh();
        let small = small.timing.unwrap();
        assert!(mesh.is_empty());
        assert_eq!(small.field_accumulation_ns, 0);
        assert!(small.extraction_ns < first.extraction_ns, "{small:?} vs {first:?}");
    }
}
