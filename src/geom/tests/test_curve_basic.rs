use crate::geom::{
    Curve3, NurbsCurve3, NurbsError, Point3, Tolerance, Vec3, Vec4, bspline_point,
    nurbs_derivatives, tessellate_curve_uniform,
};

/// Quarter circle of radius one as a rational quadratic.
fn quarter_circle() -> NurbsCurve3 {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    NurbsCurve3::new(
        2,
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        vec![
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(1.0, 1.0, 0.0, w),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
        ],
    )
    .unwrap()
}

fn cubic_open() -> NurbsCurve3 {
    NurbsCurve3::from_points(
        3,
        vec![0.0, 0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0, 1.0],
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, 2.0, 1.0),
            Point3::new(4.0, 0.0, 1.0),
            Point3::new(6.0, 1.0, 0.0),
        ],
    )
    .unwrap()
}

#[test]
fn tessellate_curve_preserves_endpoints() {
    let curve = cubic_open();
    let pts = tessellate_curve_uniform(&curve, 10);
    assert_eq!(pts.len(), 11);
    assert_eq!(pts.first().copied(), Some(Point3::new(0.0, 0.0, 0.0)));
    assert_eq!(pts.last().copied(), Some(Point3::new(6.0, 1.0, 0.0)));
}

#[test]
fn rational_quarter_circle_stays_on_circle() {
    let curve = quarter_circle();
    let tol = Tolerance::new(1e-12);
    for p in tessellate_curve_uniform(&curve, 32) {
        assert!(tol.approx_eq_f64(p.to_vec3().length(), 1.0), "{p:?}");
        assert!(p.z.abs() < 1e-15);
    }
    assert!(tol.approx_eq_point3(curve.point_at(0.5), Point3::new(
        std::f64::consts::FRAC_1_SQRT_2,
        std::f64::consts::FRAC_1_SQRT_2,
        0.0,
    )));
}

#[test]
fn quarter_circle_tangent_is_perpendicular_to_radius() {
    let curve = quarter_circle();
    for i in 0..=8 {
        let t = f64::from(i) / 8.0;
        let p = curve.point_at(t).to_vec3();
        let tangent = curve.tangent_at(t);
        assert!((tangent.length() - 1.0).abs() < 1e-12);
        assert!(p.dot(tangent).abs() < 1e-12, "t={t}");
    }
    let start = curve.tangent_at(0.0);
    assert!(Tolerance::new(1e-12).approx_eq_vec3(start, Vec3::Y));
}

#[test]
fn analytic_derivative_matches_central_difference() {
    let curve = cubic_open();
    let t = 0.37;
    let h = 1e-6;
    let fd = curve
        .point_at(t + h)
        .sub_point(curve.point_at(t - h))
        .div_scalar(2.0 * h);
    let d = curve.derivative_at(t);
    assert!(Tolerance::new(1e-5).approx_eq_vec3(d, fd), "{d:?} vs {fd:?}");
}

#[test]
fn normalized_parameter_maps_onto_knot_range() {
    let curve = NurbsCurve3::from_points(
        1,
        vec![2.0, 2.0, 6.0, 6.0],
        &[Point3::new(0.0, 0.0, 0.0), Point3::new(8.0, 0.0, 0.0)],
    )
    .unwrap();
    assert_eq!(curve.parameter_at(0.25), 3.0);
    assert_eq!(curve.point_at(0.25), Point3::new(2.0, 0.0, 0.0));
    // the knot-space derivative is the chord over the knot span
    let ders = curve.derivatives_at(0.5, 1);
    assert_eq!(ders[1], Vec3::new(2.0, 0.0, 0.0));
}

#[test]
fn derivative_follows_normalized_parameter_on_offset_knots() {
    let curve = NurbsCurve3::from_points(
        1,
        vec![2.0, 2.0, 6.0, 6.0],
        &[Point3::new(0.0, 0.0, 0.0), Point3::new(8.0, 0.0, 0.0)],
    )
    .unwrap();
    // the whole chord is traversed as t runs over [0, 1]
    assert_eq!(curve.derivative_at(0.5), Vec3::new(8.0, 0.0, 0.0));

    let t = 0.4;
    let h = 1e-6;
    let fd = curve
        .point_at(t + h)
        .sub_point(curve.point_at(t - h))
        .div_scalar(2.0 * h);
    assert!(Tolerance::new(1e-6).approx_eq_vec3(curve.derivative_at(t), fd), "{fd:?}");
    assert!(Tolerance::new(1e-12).approx_eq_vec3(curve.tangent_at(t), Vec3::X));
}

#[test]
fn zeroth_derivative_is_the_point() {
    let curve = quarter_circle();
    let tol = Tolerance::new(1e-12);
    for t in [0.0, 0.2, 0.5, 0.9, 1.0] {
        let ders = curve.derivatives_at(t, 0);
        assert_eq!(ders.len(), 1);
        assert!(tol.approx_eq_point3(Point3::from(ders[0]), curve.point_at(t)));
    }
}

#[test]
fn homogeneous_point_carries_weight() {
    let curve = quarter_circle();
    let h = bspline_point(2, curve.knots(), curve.control_points(), 0.5);
    let expected_w = 0.5 + 0.5 * std::f64::consts::FRAC_1_SQRT_2;
    assert!((h.w - expected_w).abs() < 1e-12);
    let p = h.to_point3();
    assert!((p.to_vec3().length() - 1.0).abs() < 1e-12);
}

#[test]
fn derivative_stack_has_requested_length() {
    let curve = cubic_open();
    let ders = nurbs_derivatives(3, curve.knots(), curve.control_points(), 0.2, 5);
    assert_eq!(ders.len(), 6);
    // orders above the degree vanish up to rounding of the weight derivatives
    assert!(ders[4].length() < 1e-9);
    assert!(ders[5].length() < 1e-9);
}

#[test]
fn too_few_control_points_are_rejected() {
    let err = NurbsCurve3::from_points(3, vec![0.0; 7], &[Point3::ORIGIN; 3]).unwrap_err();
    assert_eq!(
        err,
        NurbsError::TooFewControlPoints {
            required: 4,
            actual: 3
        }
    );
    assert!(err.to_string().contains("at least 4"));
}
