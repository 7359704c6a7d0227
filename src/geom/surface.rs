use super::basis::{basis_functions, find_span};
use super::core::{Point3, Vec4};
use super::curve::{NurbsError, is_valid_control_point, map_to_knots, validate_knots};
use super::mesh::GeomMesh;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub trait Surface: Sync {
    fn point_at(&self, u: f64, v: f64) -> Point3;

    #[must_use]
    fn domain_u(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn domain_v(&self) -> (f64, f64) {
        (0.0, 1.0)
    }
}

/// Euclidean point on a rational tensor-product surface at knot parameters
/// `(u, v)`.
///
/// `control_points[i][j]` is indexed by u-row `i` and v-column `j`. Each
/// control point is projected into homogeneous space before weighting and
/// the sum is divided by its `w` without a zero check.
#[must_use]
pub fn surface_point(
    p: usize,
    q: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    control_points: &[Vec<Vec4>],
    u: f64,
    v: f64,
) -> Point3 {
    let uspan = find_span(p, u, knots_u);
    let vspan = find_span(q, v, knots_v);
    let nu = basis_functions(uspan, u, p, knots_u);
    let nv = basis_functions(vspan, v, q, knots_v);

    let mut sw = Vec4::ZERO;
    for (l, nv_l) in nv.iter().enumerate() {
        let mut temp = Vec4::ZERO;
        for (k, nu_k) in nu.iter().enumerate() {
            let point = control_points[uspan - p + k][vspan - q + l].weighted();
            temp += point * *nu_k;
        }
        sw += temp * *nv_l;
    }

    sw.to_point3()
}

/// Rational B-spline surface evaluated with normalized `(t1, t2) ∈ [0, 1]²`.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsSurface {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    control_points: Vec<Vec<Vec4>>,
}

impl NurbsSurface {
    /// Validates the control net against both knot vectors.
    ///
    /// The net must have `knots_u.len() - degree_u - 1` rows of
    /// `knots_v.len() - degree_v - 1` points each.
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<Vec4>>,
    ) -> Result<Self, NurbsError> {
        validate_knots(degree_u, control_points.len(), &knots_u)?;

        let columns = control_points.first().map_or(0, Vec::len);
        validate_knots(degree_v, columns, &knots_v)?;

        for (row, points) in control_points.iter().enumerate() {
            if points.len() != columns {
                return Err(NurbsError::RaggedControlNet {
                    row,
                    expected: columns,
                    actual: points.len(),
                });
            }
            if let Some(col) = points.iter().position(|p| !is_valid_control_point(*p)) {
                return Err(NurbsError::InvalidControlPoint {
                    index: row * columns + col,
                });
            }
        }

        Ok(Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
        })
    }

    #[must_use]
    pub fn degrees(&self) -> (usize, usize) {
        (self.degree_u, self.degree_v)
    }

    #[must_use]
    pub fn knots_u(&self) -> &[f64] {
        &self.knots_u
    }

    #[must_use]
    pub fn knots_v(&self) -> &[f64] {
        &self.knots_v
    }

    #[must_use]
    pub fn control_points(&self) -> &[Vec<Vec4>] {
        &self.control_points
    }
}

impl Surface for NurbsSurface {
    fn point_at(&self, t1: f64, t2: f64) -> Point3 {
        let u = map_to_knots(&self.knots_u, t1);
        let v = map_to_knots(&self.knots_v, t2);
        surface_point(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            u,
            v,
        )
    }
}

/// Evaluates the wrapped surface with its parameters exchanged.
#[derive(Debug, Clone, Copy)]
pub struct SwappedSurface<'a, S: Surface + ?Sized> {
    inner: &'a S,
}

impl<'a, S: Surface + ?Sized> SwappedSurface<'a, S> {
    #[must_use]
    pub const fn new(inner: &'a S) -> Self {
        Self { inner }
    }
}

impl<S: Surface + ?Sized> Surface for SwappedSurface<'_, S> {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.inner.point_at(v, u)
    }

    fn domain_u(&self) -> (f64, f64) {
        self.inner.domain_v()
    }

    fn domain_v(&self) -> (f64, f64) {
        self.inner.domain_u()
    }
}

/// Samples a `(slices + 1) × (stacks + 1)` vertex grid and triangulates it.
///
/// Vertex `(i, j)` sits at `u = j / slices`, `v = i / stacks` across the
/// surface domains and is stored row-major by `v`. Each grid quad becomes two
/// triangles `(a, b, d)` and `(b, c, d)`. UVs carry the normalized grid
/// coordinates.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn tessellate_surface_grid<S: Surface + ?Sized>(
    surface: &S,
    slices: usize,
    stacks: usize,
) -> GeomMesh {
    let slices = slices.max(1);
    let stacks = stacks.max(1);
    let row_len = slices + 1;

    let rows = sample_rows(surface, slices, stacks);
    let positions: Vec<[f64; 3]> = rows.into_iter().flatten().collect();

    let mut uvs = Vec::with_capacity(positions.len());
    for i in 0..=stacks {
        for j in 0..=slices {
            uvs.push([j as f64 / slices as f64, i as f64 / stacks as f64]);
        }
    }

    let mut indices = Vec::with_capacity(slices * stacks * 6);
    for i in 0..stacks {
        for j in 0..slices {
            let a = (i * row_len + j) as u32;
            let b = (i * row_len + j + 1) as u32;
            let c = ((i + 1) * row_len + j + 1) as u32;
            let d = ((i + 1) * row_len + j) as u32;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    GeomMesh::new(positions, indices).with_uvs(uvs)
}

fn sample_row<S: Surface + ?Sized>(surface: &S, slices: usize, stacks: usize, i: usize) -> Vec<[f64; 3]> {
    let (u0, u1) = surface.domain_u();
    let (v0, v1) = surface.domain_v();
    let v = v0 + (v1 - v0) * (i as f64 / stacks as f64);
    (0..=slices)
        .map(|j| {
            let u = u0 + (u1 - u0) * (j as f64 / slices as f64);
            surface.point_at(u, v).to_array()
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn sample_rows<S: Surface + ?Sized>(surface: &S, slices: usize, stacks: usize) -> Vec<Vec<[f64; 3]>> {
    (0..=stacks)
        .into_par_iter()
        .map(|i| sample_row(surface, slices, stacks, i))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn sample_rows<S: Surface + ?Sized>(surface: &S, slices: usize, stacks: usize) -> Vec<Vec<[f64; 3]>> {
    (0..=stacks)
        .map(|i| sample_row(surface, slices, stacks, i))
        .collect()
}
