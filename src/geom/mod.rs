mod basis;
mod core;
mod curve;
mod diagnostics;
pub mod marching_cubes;
mod mesh;
mod metaballs;
mod metrics;
mod surface;

pub use basis::{basis_function_derivatives, basis_functions, binomial, find_span};
pub use self::core::{Point3, Tolerance, Vec3, Vec4};
pub use curve::{
    Curve3, NurbsCurve3, NurbsError, bspline_derivatives, bspline_point, nurbs_derivatives,
    rational_curve_derivatives, tessellate_curve_uniform,
};
pub use diagnostics::GeomMeshDiagnostics;
pub use marching_cubes::{
    ExtractionStats, MarchingCubes, MarchingCubesError, MarchingCubesOptions, ScalarField,
};
pub use mesh::{GeomMesh, Triangle, TriangleBatch, TriangleSink, TriangleSoup};
pub use metaballs::{
    MAX_RESOLUTION, MIN_RESOLUTION, MetaballError, MetaballOptions, MetaballScene,
};
pub use metrics::{GeomMetrics, GeomTimingReport, TimingBucket};
pub use surface::{NurbsSurface, Surface, SwappedSurface, surface_point, tessellate_surface_grid};

#[cfg(test)]
mod tests;
