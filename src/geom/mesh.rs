use std::collections::HashMap;

use super::core::{Point3, Tolerance, Vec3};

/// Indexed triangle mesh handed to renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<[f64; 2]>>,
    pub normals: Option<Vec<[f64; 3]>>,
}

impl GeomMesh {
    /// Create a new mesh with positions and indices only.
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<[f64; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<[f64; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Uniform scale about the origin. Normals are unaffected.
    pub fn scale(&mut self, factor: f64) {
        for p in &mut self.positions {
            p[0] *= factor;
            p[1] *= factor;
            p[2] *= factor;
        }
    }

    /// Positions flattened to `x, y, z, x, y, z, ...` for GPU upload.
    #[must_use]
    pub fn flat_positions(&self) -> Vec<f32> {
        flatten(&self.positions)
    }

    #[must_use]
    pub fn flat_normals(&self) -> Option<Vec<f32>> {
        self.normals.as_deref().map(flatten)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn flatten(values: &[[f64; 3]]) -> Vec<f32> {
    values
        .iter()
        .flat_map(|v| v.iter().map(|c| *c as f32))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Triangle soup
// ─────────────────────────────────────────────────────────────────────────────

/// One extracted triangle with per-corner normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub positions: [Point3; 3],
    pub normals: [Vec3; 3],
}

impl Triangle {
    #[must_use]
    pub const fn new(positions: [Point3; 3], normals: [Vec3; 3]) -> Self {
        Self { positions, normals }
    }

    /// Twice the triangle area.
    #[must_use]
    pub fn double_area(&self) -> f64 {
        let [a, b, c] = self.positions;
        b.sub_point(a).cross(c.sub_point(a)).length()
    }

    #[must_use]
    pub fn is_degenerate(&self, tol: Tolerance) -> bool {
        let area = self.double_area();
        !area.is_finite() || area <= tol.eps_squared()
    }
}

/// A bounded run of triangles delivered to a [`TriangleSink`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleBatch {
    pub triangles: Vec<Triangle>,
}

impl TriangleBatch {
    #[must_use]
    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(triangles),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn push(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
    }
}

/// Receiver for streamed extraction output.
pub trait TriangleSink {
    fn accept(&mut self, batch: &TriangleBatch);
}

impl<F> TriangleSink for F
where
    F: FnMut(&TriangleBatch),
{
    fn accept(&mut self, batch: &TriangleBatch) {
        self(batch);
    }
}

/// Non-indexed triangle list; every triangle owns its three vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup {
    pub triangles: Vec<Triangle>,
}

impl TriangleSink for TriangleSoup {
    fn accept(&mut self, batch: &TriangleBatch) {
        self.triangles.extend_from_slice(&batch.triangles);
    }
}

impl TriangleSoup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triangle> {
        self.triangles.iter()
    }

    /// Rescales every normal to unit length; zero normals stay zero.
    pub fn normalize_normals(&mut self) {
        for tri in &mut self.triangles {
            for n in &mut tri.normals {
                *n = n.normalized_or_zero();
            }
        }
    }

    /// Uniform scale about the origin.
    pub fn scale(&mut self, factor: f64) {
        for tri in &mut self.triangles {
            for p in &mut tri.positions {
                *p = p.scaled(factor);
            }
        }
    }

    /// Merges vertices closer than `tol` into an indexed mesh.
    ///
    /// Merged normals are averaged and renormalized. Triangles that collapse
    /// onto a repeated index are dropped. Returns the mesh and the number of
    /// vertices removed by merging.
    #[must_use]
    pub fn weld(&self, tol: Tolerance) -> (GeomMesh, usize) {
        let points: Vec<Point3> = self.iter().flat_map(|t| t.positions).collect();
        let normals: Vec<Vec3> = self.iter().flat_map(|t| t.normals).collect();

        let (remap, unique) = weld_points(&points, tol);

        let mut out_positions = vec![[0.0; 3]; unique.len()];
        let mut out_normals = vec![Vec3::ZERO; unique.len()];
        for (i, &target) in remap.iter().enumerate() {
            let target = target as usize;
            if unique[target] == i {
                out_positions[target] = points[i].to_array();
            }
            out_normals[target] = out_normals[target] + normals[i];
        }

        let mut indices = Vec::with_capacity(remap.len());
        for tri in remap.chunks_exact(3) {
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                continue;
            }
            indices.extend_from_slice(tri);
        }

        let normals = out_normals
            .into_iter()
            .map(|n| n.normalized_or_zero().to_array())
            .collect();
        let welded = points.len() - unique.len();
        (GeomMesh::new(out_positions, indices).with_normals(normals), welded)
    }
}

/// Hash-grid vertex welding.
///
/// Returns, for every input point, the index of its merged vertex, plus the
/// input index that founded each merged vertex. Non-finite points are never
/// merged.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn weld_points(points: &[Point3], tol: Tolerance) -> (Vec<u32>, Vec<usize>) {
    if !tol.eps.is_finite() || tol.eps <= 0.0 {
        return ((0..points.len() as u32).collect(), (0..points.len()).collect());
    }

    let inv = 1.0 / tol.eps;

    fn quantize(value: f64, inv: f64) -> Option<i64> {
        if !value.is_finite() {
            return None;
        }
        let q = (value * inv).floor();
        Some(q.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    let mut buckets: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    let mut remap: Vec<u32> = Vec::with_capacity(points.len());
    let mut founders: Vec<usize> = Vec::new();

    for (i, p) in points.iter().copied().enumerate() {
        let key = match (quantize(p.x, inv), quantize(p.y, inv), quantize(p.z, inv)) {
            (Some(kx), Some(ky), Some(kz)) => Some((kx, ky, kz)),
            _ => None,
        };

        let found = key.and_then(|key| {
            for dx in -1i64..=1 {
                for dy in -1i64..=1 {
                    for dz in -1i64..=1 {
                        let lookup = (key.0 + dx, key.1 + dy, key.2 + dz);
                        let Some(candidates) = buckets.get(&lookup) else {
                            continue;
                        };
                        for &cand in candidates {
                            if tol.approx_eq_point3(points[founders[cand as usize]], p) {
                                return Some(cand);
                            }
                        }
                    }
                }
            }
            None
        });

        let out_idx = if let Some(existing) = found {
            existing
        } else {
            let new_idx = founders.len() as u32;
            founders.push(i);
            if let Some(key) = key {
                buckets.entry(key).or_default().push(new_idx);
            }
            new_idx
        };
        remap.push(out_idx);
    }

    (remap, founders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new([a.into(), b.into(), c.into()], [Vec3::Z; 3])
    }

    #[test]
    fn test_closure_sink_receives_batches() {
        let mut seen = 0usize;
        let mut sink = |batch: &TriangleBatch| seen += batch.len();
        let mut batch = TriangleBatch::default();
        batch.push(tri([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        sink.accept(&batch);
        sink.accept(&batch);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_weld_shares_edge_vertices() {
        let mut soup = TriangleSoup::new();
        soup.triangles.push(tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        soup.triangles.push(tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0 + 1e-12, 0.0]));

        let (mesh, welded) = soup.weld(Tolerance::WELD);
        assert_eq!(welded, 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 1, 3, 2]);
        let normals = mesh.normals.unwrap();
        assert!(normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_weld_drops_collapsed_triangles() {
        let mut soup = TriangleSoup::new();
        soup.triangles.push(tri([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        let (mesh, welded) = soup.weld(Tolerance::WELD);
        assert_eq!(welded, 1);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_weld_keeps_non_finite_points_apart() {
        let nan = [f64::NAN, 0.0, 0.0];
        let (remap, unique) = weld_points(
            &[nan.into(), nan.into(), Point3::ORIGIN],
            Tolerance::WELD,
        );
        assert_eq!(remap, vec![0, 1, 2]);
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_flat_positions_layout() {
        let mesh = GeomMesh::new(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], vec![]);
        assert_eq!(mesh.flat_positions(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(mesh.flat_normals(), None);
    }
}
