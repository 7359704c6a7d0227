//! Marching-cubes isosurface extraction over an additive scalar field.
//!
//! - [`ScalarField`] accumulates metaball and plane contributions and caches
//!   central-difference gradients per reset cycle.
//! - [`MarchingCubes`] classifies each interior cube against the lookup
//!   tables and streams triangles to a [`TriangleSink`](crate::geom::TriangleSink).

mod extract;
mod field;
mod tables;

pub use extract::{
    DEFAULT_BATCH_CAPACITY, DEFAULT_ISOLATION, ExtractionStats, MIN_BATCH_CAPACITY,
    MarchingCubes, MarchingCubesError, MarchingCubesOptions,
};
pub use field::ScalarField;
pub use tables::{EDGE_TABLE, TRI_TABLE};
