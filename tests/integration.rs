use organic_engine::geom::marching_cubes::MarchingCubesOptions;
use organic_engine::geom::{
    Curve3, GeomMeshDiagnostics, MarchingCubes, MetaballError, MetaballOptions, MetaballScene,
    NurbsCurve3, NurbsSurface, Point3, Surface, Tolerance, TriangleBatch, Vec4,
    tessellate_curve_uniform, tessellate_surface_grid,
};

#[test]
fn metaball_options_deserialize_with_defaults() {
    let options: MetaballOptions =
        serde_json::from_str(r#"{ "resolution": 48, "ballSize": 2.5 }"#).expect("valid options");
    assert_eq!(options.resolution, 48);
    assert_eq!(options.ball_size, 2.5);
    assert_eq!(options.size, 500.0);
    assert_eq!(options.subtract, 10.0);
    assert_eq!(options.isolation, 80.0);
    assert!(options.validate().is_ok());
}

#[test]
fn invalid_metaball_options_are_rejected() {
    let options: MetaballOptions =
        serde_json::from_str(r#"{ "size": -1.0 }"#).expect("parses before validation");
    let err = MetaballScene::new(options).expect_err("negative size");
    assert!(matches!(err, MetaballError::InvalidParameter { name: "size", .. }));
    assert!(err.to_string().contains("size"));
}

#[test]
fn marching_cubes_options_deserialize() {
    let options: MarchingCubesOptions =
        serde_json::from_str(r#"{ "batchCapacity": 96 }"#).expect("valid options");
    assert_eq!(options.batch_capacity, 96);
    assert_eq!(options.isolation, 80.0);
    assert!(MarchingCubes::with_options(8, options).is_ok());
}

#[test]
fn metaball_scene_produces_closed_mesh() {
    let mut scene = MetaballScene::new(MetaballOptions {
        resolution: 32,
        ball_size: 30.0,
        ..MetaballOptions::default()
    })
    .expect("valid options");

    scene.update_balls(&[
        Point3::new(-30.0, 0.0, 0.0),
        Point3::new(30.0, 10.0, 0.0),
        Point3::new(0.0, -20.0, 25.0),
    ]);
    let (mesh, diagnostics) = scene.generate_mesh();

    assert!(!mesh.is_empty());
    assert_eq!(diagnostics.vertex_count, mesh.vertex_count());
    assert_eq!(diagnostics.triangle_count, mesh.triangle_count());
    assert!(diagnostics.is_valid_solid(), "{diagnostics}");
    assert!(mesh.positions.iter().flatten().all(|c| c.abs() <= 500.0));
}

#[test]
fn streamed_extraction_matches_welded_topology() {
    let mut cubes = MarchingCubes::new(24);
    cubes.add_ball(0.45, 0.5, 0.5, 0.6, 10.0);
    cubes.add_ball(0.6, 0.55, 0.5, 0.4, 10.0);

    let mut total = 0;
    let stats = cubes.extract_all(80.0, &mut |batch: &TriangleBatch| total += batch.len());
    assert_eq!(total, stats.triangles);

    let (mesh, _) = cubes.generate_geometry().weld(Tolerance::WELD);
    let diagnostics = GeomMeshDiagnostics::from_mesh(&mesh, Tolerance::WELD);
    assert!(diagnostics.is_watertight(), "{diagnostics}");
    assert_eq!(mesh.triangle_count(), total);
}

#[test]
fn curve_and_surface_share_boundary() {
    let edge = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(2.0, 0.0, -1.0),
        Point3::new(3.0, 0.0, 0.0),
    ];
    let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
    let curve = NurbsCurve3::from_points(3, knots.clone(), &edge).expect("valid curve");

    let rows = edge
        .iter()
        .map(|p| {
            vec![
                Vec4::from_point(*p, 1.0),
                Vec4::from_point(Point3::new(p.x, 2.0, p.z), 1.0),
            ]
        })
        .collect();
    let surface =
        NurbsSurface::new(3, 1, knots, vec![0.0, 0.0, 1.0, 1.0], rows).expect("valid surface");

    let tol = Tolerance::new(1e-12);
    for (i, p) in tessellate_curve_uniform(&curve, 8).into_iter().enumerate() {
        let t = i as f64 / 8.0;
        assert!(tol.approx_eq_point3(p, surface.point_at(t, 0.0)));
    }

    let mesh = tessellate_surface_grid(&surface, 8, 2);
    for (j, p) in mesh.positions.iter().take(9).enumerate() {
        let t = j as f64 / 8.0;
        assert!(tol.approx_eq_point3(Point3::from(*p), curve.point_at(t)));
    }
}
