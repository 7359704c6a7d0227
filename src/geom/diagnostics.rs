//! Mesh diagnostics for extracted and tessellated geometry.
//!
//! Diagnostics are collected after a mesh is built and can be used for:
//!
//! - Validating mesh quality (watertight, manifold, no degenerates)
//! - Debugging extraction issues (open edges where the surface leaves the grid)
//! - Tracking repair operations (welding, collapsed triangles)
//! - Performance profiling (timing buckets)
//!
//! # Example
//!
//! ```ignore
//! use organic_engine::geom::{MetaballScene, MetaballOptions};
//!
//! let mut scene = MetaballScene::new(MetaballOptions::default())?;
//! scene.update_balls(&points);
//! let (mesh, diagnostics) = scene.generate_mesh();
//!
//! if !diagnostics.is_watertight() {
//!     println!("Mesh has {} open edges", diagnostics.open_edge_count);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::core::{Point3, Tolerance};
use super::mesh::GeomMesh;

/// Diagnostics for a generated mesh.
///
/// # Topology Metrics
///
/// - `open_edge_count`: Edges with only one adjacent triangle (holes in mesh)
/// - `non_manifold_edge_count`: Edges with more than two adjacent triangles
///
/// # Repair Statistics
///
/// - `welded_vertex_count`: Vertices merged during tolerance-based welding
/// - `degenerate_triangle_count`: Zero-area or collapsed triangles
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeomMeshDiagnostics {
    /// Total number of vertices in the final mesh.
    pub vertex_count: usize,

    /// Total number of triangles in the final mesh.
    pub triangle_count: usize,

    /// Number of vertices merged during tolerance-based welding.
    pub welded_vertex_count: usize,

    /// Number of degenerate triangles, either dropped while welding or still
    /// present with (near) zero area.
    pub degenerate_triangle_count: usize,

    /// Number of open (boundary) edges in the mesh.
    ///
    /// A watertight mesh has zero open edges. Isosurfaces gain open edges
    /// where the surface is cut by the grid boundary.
    pub open_edge_count: usize,

    /// Number of non-manifold edges in the mesh.
    pub non_manifold_edge_count: usize,

    /// Optional timing breakdown by operation category.
    ///
    /// Only populated when the `mesh_engine_metrics` feature is enabled
    /// and the target is not WASM.
    #[serde(skip)]
    pub timing: Option<super::metrics::GeomTimingReport>,

    /// Human-readable warnings about mesh issues.
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    /// Creates a new empty diagnostics struct with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts vertices, triangles, degenerate triangles and edge topology of
    /// an indexed mesh, and records a warning for each issue class found.
    #[must_use]
    pub fn from_mesh(mesh: &GeomMesh, tol: Tolerance) -> Self {
        let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&mesh.indices);
        let mut diagnostics = Self {
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
            degenerate_triangle_count: count_degenerate_triangles(mesh, tol),
            open_edge_count,
            non_manifold_edge_count,
            ..Self::default()
        };

        if open_edge_count > 0 {
            diagnostics.add_warning("mesh has open edges");
        }
        if non_manifold_edge_count > 0 {
            diagnostics.add_warning("mesh has non-manifold edges");
        }
        if diagnostics.degenerate_triangle_count > 0 {
            diagnostics.add_warning("mesh has degenerate triangles");
        }
        diagnostics
    }

    /// Returns `true` if the mesh is watertight (no open edges).
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    /// Returns `true` if the mesh is manifold (no non-manifold edges).
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Returns `true` if the mesh is both watertight and manifold.
    #[must_use]
    pub fn is_valid_solid(&self) -> bool {
        self.is_watertight() && self.is_manifold()
    }

    /// Returns `true` if no issues were detected and no warnings recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.open_edge_count == 0
            && self.non_manifold_edge_count == 0
            && self.degenerate_triangle_count == 0
            && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns the total number of topology issues (open + non-manifold edges).
    #[must_use]
    pub fn topology_issue_count(&self) -> usize {
        self.open_edge_count + self.non_manifold_edge_count
    }

    /// Returns the total number of repairs performed (welded + degenerates).
    #[must_use]
    pub fn repair_count(&self) -> usize {
        self.welded_vertex_count + self.degenerate_triangle_count
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Merges another diagnostics struct into this one.
    ///
    /// Counts are summed and warnings appended. `timing` from `other` is
    /// ignored; use a parent `GeomMetrics` to track timing across operations.
    pub fn merge(&mut self, other: &GeomMeshDiagnostics) {
        self.vertex_count += other.vertex_count;
        self.triangle_count += other.triangle_count;
        self.welded_vertex_count += other.welded_vertex_count;
        self.degenerate_triangle_count += other.degenerate_triangle_count;
        self.open_edge_count += other.open_edge_count;
        self.non_manifold_edge_count += other.non_manifold_edge_count;
        self.warnings.extend(other.warnings.iter().cloned());
    }

    /// Returns a short summary string suitable for logging.
    ///
    /// Format: `"V:{vertices} T:{triangles} [issues...]"`
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];

        if self.welded_vertex_count > 0 {
            parts.push(format!("welded:{}", self.welded_vertex_count));
        }
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }

        parts.join(" ")
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;

        if self.welded_vertex_count > 0 || self.degenerate_triangle_count > 0 {
            writeln!(f, "  Repairs:")?;
            if self.welded_vertex_count > 0 {
                writeln!(f, "    - Welded vertices: {}", self.welded_vertex_count)?;
            }
            if self.degenerate_triangle_count > 0 {
                writeln!(f, "    - Degenerate triangles: {}", self.degenerate_triangle_count)?;
            }
        }

        if self.open_edge_count > 0 || self.non_manifold_edge_count > 0 {
            writeln!(f, "  Topology issues:")?;
            if self.open_edge_count > 0 {
                writeln!(f, "    - Open edges: {}", self.open_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    - Non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        if let Some(ref timing) = self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }

        let status = if self.is_clean() {
            "CLEAN"
        } else if self.is_valid_solid() {
            "VALID (with repairs)"
        } else {
            "ISSUES DETECTED"
        };
        writeln!(f, "  Status: {status}")?;

        Ok(())
    }
}

/// Returns `(open, non_manifold)` edge counts. Triangles with repeated
/// indices are skipped.
pub(crate) fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }

        for (ea, eb) in [(i0, i1), (i1, i2), (i2, i0)] {
            let key = if ea <= eb { (ea, eb) } else { (eb, ea) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }

    let mut open_edge_count = 0usize;
    let mut non_manifold_edge_count = 0usize;
    for count in edge_counts.into_values() {
        if count == 1 {
            open_edge_count += 1;
        } else if count > 2 {
            non_manifold_edge_count += 1;
        }
    }

    (open_edge_count, non_manifold_edge_count)
}

fn count_degenerate_triangles(mesh: &GeomMesh, tol: Tolerance) -> usize {
    let point = |i: u32| mesh.positions.get(i as usize).copied().map(Point3::from);
    mesh.indices
        .chunks_exact(3)
        .filter(|tri| {
            let (Some(a), Some(b), Some(c)) = (point(tri[0]), point(tri[1]), point(tri[2])) else {
                return true;
            };
            let area2 = b.sub_point(a).cross(c.sub_point(a)).length_squared();
            !area2.is_finite() || area2 <= tol.eps_squared() * tol.eps_squared()
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> GeomMesh {
        GeomMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            vec![0, 2, 1, 0, 1, 3, 1, 2, 3, 0, 3, 2],
        )
    }

    #[test]
    fn test_default_is_clean() {
        let diag = GeomMeshDiagnostics::default();
        assert!(diag.is_clean());
        assert!(diag.is_watertight());
        assert!(diag.is_manifold());
        assert!(diag.is_valid_solid());
        assert!(!diag.has_warnings());
    }

    #[test]
    fn test_closed_tetrahedron_is_clean() {
        let diag = GeomMeshDiagnostics::from_mesh(&tetrahedron(), Tolerance::default());
        assert_eq!(diag.vertex_count, 4);
        assert_eq!(diag.triangle_count, 4);
        assert!(diag.is_clean(), "{diag}");
    }

    #[test]
    fn test_missing_face_opens_three_edges() {
        let mut mesh = tetrahedron();
        mesh.indices.truncate(9);
        let diag = GeomMeshDiagnostics::from_mesh(&mesh, Tolerance::default());
        assert_eq!(diag.open_edge_count, 3);
        assert!(!diag.is_watertight());
        assert_eq!(diag.warnings, vec!["mesh has open edges".to_string()]);
    }

    #[test]
    fn test_fin_is_non_manifold() {
        let mut mesh = tetrahedron();
        mesh.positions.push([1.0, 1.0, -1.0]);
        mesh.indices.extend_from_slice(&[1, 2, 4]);
        let diag = GeomMeshDiagnostics::from_mesh(&mesh, Tolerance::default());
        assert_eq!(diag.non_manifold_edge_count, 1);
        assert_eq!(diag.open_edge_count, 2);
        assert!(!diag.is_valid_solid());
    }

    #[test]
    fn test_zero_area_triangle_is_degenerate() {
        let mesh = GeomMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![0, 1, 2],
        );
        let diag = GeomMeshDiagnostics::from_mesh(&mesh, Tolerance::default());
        assert_eq!(diag.degenerate_triangle_count, 1);
    }

    #[test]
    fn test_merge() {
        let mut diag1 = GeomMeshDiagnostics {
            vertex_count: 100,
            triangle_count: 50,
            open_edge_count: 2,
            warnings: vec!["first warning".to_string()],
            ..Default::default()
        };

        let diag2 = GeomMeshDiagnostics {
            vertex_count: 200,
            triangle_count: 100,
            open_edge_count: 3,
            warnings: vec!["second warning".to_string()],
            ..Default::default()
        };

        diag1.merge(&diag2);

        assert_eq!(diag1.vertex_count, 300);
        assert_eq!(diag1.triangle_count, 150);
        assert_eq!(diag1.open_edge_count, 5);
        assert_eq!(diag1.warnings.len(), 2);
    }

    #[test]
    fn test_summary_and_display() {
        let diag = GeomMeshDiagnostics {
            vertex_count: 100,
            triangle_count: 50,
            welded_vertex_count: 5,
            open_edge_count: 2,
            warnings: vec!["test warning".to_string()],
            ..Default::default()
        };

        let summary = diag.summary();
        assert_eq!(summary, "V:100 T:50 welded:5 open:2");

        let output = format!("{diag}");
        assert!(output.contains("Open edges: 2"));
        assert!(output.contains("test warning"));
        assert!(output.contains("ISSUES DETECTED"));
        assert_eq!(diag.topology_issue_count(), 2);
        assert_eq!(diag.repair_count(), 5);
    }
}
