use super::basis::{basis_function_derivatives, basis_functions, binomial, find_span};
use super::core::{Point3, Vec3, Vec4};

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    /// Central-difference derivative over the curve domain.
    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let span = b - a;
        if !span.is_finite() || span == 0.0 {
            return Vec3::ZERO;
        }

        let h = 1e-6 * span;
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        if t1 == t0 {
            return Vec3::ZERO;
        }

        let p0 = self.point_at(t0);
        let p1 = self.point_at(t1);
        p1.sub_point(p0).mul_scalar(1.0 / (t1 - t0))
    }

    /// Unit tangent, or the zero vector where the derivative vanishes.
    #[must_use]
    fn tangent_at(&self, t: f64) -> Vec3 {
        self.derivative_at(t).normalized_or_zero()
    }
}

/// Samples `divisions + 1` evenly spaced points across the curve domain.
#[must_use]
pub fn tessellate_curve_uniform<C: Curve3 + ?Sized>(curve: &C, divisions: usize) -> Vec<Point3> {
    let (a, b) = curve.domain();
    if divisions == 0 {
        return vec![curve.point_at(a)];
    }

    let step = (b - a) / divisions as f64;
    (0..=divisions)
        .map(|i| {
            // land exactly on the end of the domain
            let t = if i == divisions { b } else { a + step * i as f64 };
            curve.point_at(t)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// NURBS kernels
// ─────────────────────────────────────────────────────────────────────────────

/// Homogeneous B-spline point `(wx, wy, wz, w)` at knot parameter `u`.
///
/// Divide by `w` to get the Euclidean point.
#[must_use]
pub fn bspline_point(p: usize, knots: &[f64], control_points: &[Vec4], u: f64) -> Vec4 {
    let span = find_span(p, u, knots);
    let n = basis_functions(span, u, p, knots);

    let mut c = Vec4::ZERO;
    for (j, nj) in n.iter().enumerate() {
        let point = control_points[span - p + j];
        let w_nj = point.w * nj;
        c.x += point.x * w_nj;
        c.y += point.y * w_nj;
        c.z += point.z * w_nj;
        c.w += point.w * nj;
    }
    c
}

/// Homogeneous derivatives `0..=nd` of a B-spline at knot parameter `u`.
///
/// Control points are projected into homogeneous space before weighting.
/// Orders above `min(nd, p)` are zero.
#[must_use]
pub fn bspline_derivatives(
    p: usize,
    knots: &[f64],
    control_points: &[Vec4],
    u: f64,
    nd: usize,
) -> Vec<Vec4> {
    let du = nd.min(p);
    let span = find_span(p, u, knots);
    let nders = basis_function_derivatives(span, u, p, du, knots);

    let mut ck = vec![Vec4::ZERO; nd + 1];
    for (k, row) in nders.iter().enumerate() {
        ck[k] = row
            .iter()
            .enumerate()
            .fold(Vec4::ZERO, |acc, (j, n)| {
                acc + control_points[span - p + j].weighted() * *n
            });
    }
    ck
}

/// Euclidean derivatives from a stack of homogeneous derivatives.
///
/// Applies the quotient rule order by order:
/// `CK[k] = (A[k] - Σ C(k, i) · w[i] · CK[k - i]) / w[0]`.
#[must_use]
pub fn rational_curve_derivatives(pders: &[Vec4]) -> Vec<Vec3> {
    let mut ck: Vec<Vec3> = Vec::with_capacity(pders.len());
    for (k, der) in pders.iter().enumerate() {
        let mut v = der.xyz();
        for i in 1..=k {
            v = v - ck[k - i] * (binomial(k, i) * pders[i].w);
        }
        ck.push(v / pders[0].w);
    }
    ck
}

/// Euclidean NURBS curve derivatives `0..=nd` at knot parameter `u`.
#[must_use]
pub fn nurbs_derivatives(
    p: usize,
    knots: &[f64],
    control_points: &[Vec4],
    u: f64,
    nd: usize,
) -> Vec<Vec3> {
    rational_curve_derivatives(&bspline_derivatives(p, knots, control_points, u, nd))
}

// ─────────────────────────────────────────────────────────────────────────────
// NurbsCurve3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NurbsError {
    #[error("nurbs degree must be >= 1")]
    InvalidDegree,
    #[error("nurbs requires at least {required} control points, got {actual}")]
    TooFewControlPoints { required: usize, actual: usize },
    #[error("nurbs knot length must be {expected}, got {actual}")]
    KnotCountMismatch { expected: usize, actual: usize },
    #[error("nurbs knots must be finite and non-decreasing")]
    InvalidKnots,
    #[error("nurbs knot domain is empty")]
    EmptyDomain,
    #[error("control point {index} must be finite with weight > 0")]
    InvalidControlPoint { index: usize },
    #[error("control net row {row} has {actual} points, expected {expected}")]
    RaggedControlNet {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

pub(crate) fn validate_knots(
    degree: usize,
    count: usize,
    knots: &[f64],
) -> Result<(), NurbsError> {
    if degree == 0 {
        return Err(NurbsError::InvalidDegree);
    }
    if count < degree + 1 {
        return Err(NurbsError::TooFewControlPoints {
            required: degree + 1,
            actual: count,
        });
    }
    let expected = count + degree + 1;
    if knots.len() != expected {
        return Err(NurbsError::KnotCountMismatch {
            expected,
            actual: knots.len(),
        });
    }
    if knots.iter().any(|k| !k.is_finite()) || !knots.windows(2).all(|w| w[0] <= w[1]) {
        return Err(NurbsError::InvalidKnots);
    }
    if knots[degree] >= knots[count] {
        return Err(NurbsError::EmptyDomain);
    }
    Ok(())
}

pub(crate) fn is_valid_control_point(p: Vec4) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite() && p.w.is_finite() && p.w > 0.0
}

/// Linear map of `t ∈ [0, 1]` onto `[U[0], U[last]]`. `t` is not clamped.
pub(crate) fn map_to_knots(knots: &[f64], t: f64) -> f64 {
    let first = knots[0];
    let last = knots[knots.len() - 1];
    first + t * (last - first)
}

/// Rational B-spline curve with weighted control points.
///
/// Evaluated with a normalized parameter `t ∈ [0, 1]` that is mapped onto
/// the full knot range.
#[derive(Debug, Clone, PartialEq)]
pub struct NurbsCurve3 {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<Vec4>,
}

impl NurbsCurve3 {
    pub fn new(
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Vec4>,
    ) -> Result<Self, NurbsError> {
        validate_knots(degree, control_points.len(), &knots)?;
        if let Some(index) = control_points
            .iter()
            .position(|p| !is_valid_control_point(*p))
        {
            return Err(NurbsError::InvalidControlPoint { index });
        }

        Ok(Self {
            degree,
            knots,
            control_points,
        })
    }

    /// Non-rational curve: every control point gets weight one.
    pub fn from_points(
        degree: usize,
        knots: Vec<f64>,
        points: &[Point3],
    ) -> Result<Self, NurbsError> {
        let control_points = points.iter().map(|p| Vec4::from_point(*p, 1.0)).collect();
        Self::new(degree, knots, control_points)
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    #[must_use]
    pub fn control_points(&self) -> &[Vec4] {
        &self.control_points
    }

    /// Knot parameter for a normalized `t`.
    #[must_use]
    pub fn parameter_at(&self, t: f64) -> f64 {
        map_to_knots(&self.knots, t)
    }

    /// Euclidean derivatives `0..=nd` at normalized `t`, with respect to the
    /// knot parameter.
    #[must_use]
    pub fn derivatives_at(&self, t: f64, nd: usize) -> Vec<Vec3> {
        let u = self.parameter_at(t);
        nurbs_derivatives(self.degree, &self.knots, &self.control_points, u, nd)
    }
}

impl Curve3 for NurbsCurve3 {
    #[allow(clippy::float_cmp)]
    fn point_at(&self, t: f64) -> Point3 {
        let u = self.parameter_at(t);
        let h = bspline_point(self.degree, &self.knots, &self.control_points, u);
        if h.w == 1.0 {
            Point3::new(h.x, h.y, h.z)
        } else {
            h.to_point3()
        }
    }

    /// First derivative with respect to the normalized `t`, which is the
    /// knot-space derivative scaled by the knot range.
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (Some(first), Some(last)) = (self.knots.first(), self.knots.last()) else {
            return Vec3::ZERO;
        };
        self.derivatives_at(t, 1)
            .get(1)
            .map_or(Vec3::ZERO, |d| d.mul_scalar(last - first))
    }
}
