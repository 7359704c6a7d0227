#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geom;

use std::fmt;

use geom::{
    GeomMesh, GeomMeshDiagnostics, GeomMetrics, MetaballOptions, MetaballScene, NurbsCurve3,
    NurbsError, NurbsSurface, Point3, SwappedSurface, TimingBucket, Vec4,
    tessellate_curve_uniform, tessellate_surface_grid,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsError;
use wasm_bindgen::prelude::*;

cfg_if::cfg_if! {
    if #[cfg(all(feature = "console_error_panic_hook", target_arch = "wasm32"))] {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            console_error_panic_hook::set_once();
            init_logger();
        }
    } else {
        #[wasm_bindgen(start)]
        pub fn initialize() {
            // no-op fallback when panic hook is disabled
            init_logger();
        }
    }
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {
    // no-op fallback when debug logs are disabled
}

#[cfg(all(feature = "parallel", target_arch = "wasm32"))]
#[wasm_bindgen]
pub async fn initialize_parallel(worker_count: Option<u32>) -> Result<(), JsError> {
    let threads = worker_count
        .map(|count| count.max(1) as usize)
        .or_else(|| {
            std::thread::available_parallelism()
                .map(|value| value.get())
                .ok()
        })
        .unwrap_or(1);

    wasm_bindgen_rayon::init_thread_pool(threads)
        .await
        .map_err(|err| JsError::new(&format!("kon rayon threadpool niet initialiseren: {err}")))
}

#[macro_export]
macro_rules! debug_log {
    ($($t:tt)*) => {{
        #[cfg(feature = "debug_logs")]
        {
            #[cfg(target_arch = "wasm32")]
            {
                ::web_sys::console::log_1(&::wasm_bindgen::JsValue::from_str(&format!($($t)*)));
            }
            #[cfg(not(target_arch = "wasm32"))]
            {
                println!("{}", format!($($t)*));
            }
        }
    }};
}

// ─────────────────────────────────────────────────────────────────────────────
// Exports
// ─────────────────────────────────────────────────────────────────────────────

/// Flat buffers ready for a `BufferGeometry`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeshExport {
    positions: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normals: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uvs: Option<Vec<f32>>,
    indices: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<GeomMeshDiagnostics>,
}

impl MeshExport {
    #[allow(clippy::cast_possible_truncation)]
    fn new(mesh: &GeomMesh, diagnostics: Option<GeomMeshDiagnostics>) -> Self {
        let uvs = mesh
            .uvs
            .as_ref()
            .map(|uvs| uvs.iter().flat_map(|uv| uv.map(|c| c as f32)).collect());
        Self {
            positions: mesh.flat_positions(),
            normals: mesh.flat_normals(),
            uvs,
            indices: mesh.indices.clone(),
            diagnostics,
        }
    }
}

/// NURBS-curve zoals de demo hem aanlevert: `controlPoints` als `[x, y, z, w]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NurbsCurveDescriptor {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<[f64; 4]>,
}

impl NurbsCurveDescriptor {
    fn into_curve(self) -> Result<NurbsCurve3, NurbsError> {
        let control_points = self.control_points.into_iter().map(Vec4::from).collect();
        NurbsCurve3::new(self.degree, self.knots, control_points)
    }
}

/// NURBS-oppervlak; `controlPoints[i][j]` volgt de u-rij `i` en v-kolom `j`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NurbsSurfaceDescriptor {
    degree_u: usize,
    degree_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    control_points: Vec<Vec<[f64; 4]>>,
}

impl NurbsSurfaceDescriptor {
    fn into_surface(self) -> Result<NurbsSurface, NurbsError> {
        let control_points = self
            .control_points
            .into_iter()
            .map(|row| row.into_iter().map(Vec4::from).collect())
            .collect();
        NurbsSurface::new(
            self.degree_u,
            self.degree_v,
            self.knots_u,
            self.knots_v,
            control_points,
        )
    }
}

fn sample_curve_points(curve: &NurbsCurve3, divisions: usize) -> Vec<f64> {
    let mut metrics = GeomMetrics::default();
    metrics.begin();
    let points = metrics.time(TimingBucket::CurveEvaluation, || {
        tessellate_curve_uniform(curve, divisions)
    });
    if let Some(report) = metrics.end() {
        log::debug!("curve sampling: {} ns", report.curve_evaluation_ns);
    }
    points.into_iter().flat_map(Point3::to_array).collect()
}

fn tessellate_surface(surface: &NurbsSurface, slices: usize, stacks: usize, swap_uv: bool) -> GeomMesh {
    let mut metrics = GeomMetrics::default();
    metrics.begin();
    let mesh = metrics.time(TimingBucket::SurfaceTessellation, || {
        if swap_uv {
            tessellate_surface_grid(&SwappedSurface::new(surface), slices, stacks)
        } else {
            tessellate_surface_grid(surface, slices, stacks)
        }
    });
    if let Some(report) = metrics.end() {
        log::debug!("surface tessellation: {} ns", report.surface_tessellation_ns);
    }
    mesh
}

fn points_from_flat(positions: &[f64]) -> Result<Vec<Point3>, String> {
    if positions.len() % 3 != 0 {
        return Err(format!(
            "positielijst moet een veelvoud van 3 getallen bevatten, kreeg {}",
            positions.len()
        ));
    }
    if positions.iter().any(|value| !value.is_finite()) {
        return Err("posities moeten eindige getallen zijn".to_string());
    }
    Ok(positions
        .chunks_exact(3)
        .map(|xyz| Point3::new(xyz[0], xyz[1], xyz[2]))
        .collect())
}

fn options_from_js(options: JsValue) -> Result<MetaballOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(MetaballOptions::default());
    }
    serde_wasm_bindgen::from_value(options).map_err(to_js_error)
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsError::new(&err.to_string()).into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Wasm surface
// ─────────────────────────────────────────────────────────────────────────────

/// Metaball-scène voor de browserdemo.
#[wasm_bindgen]
pub struct MetaballEngine {
    scene: MetaballScene,
}

#[wasm_bindgen]
impl MetaballEngine {
    /// Maak een scène; ontbrekende opties vallen terug op de standaardwaarden.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<MetaballEngine, JsValue> {
        let options = options_from_js(options)?;
        let scene = MetaballScene::new(options).map_err(to_js_error)?;
        Ok(MetaballEngine { scene })
    }

    /// Wijzig de rasterresolutie; het veld is leeg tot de volgende `update_balls`.
    #[wasm_bindgen]
    pub fn set_resolution(&mut self, resolution: u32) -> Result<(), JsValue> {
        self.scene
            .set_resolution(resolution as usize)
            .map_err(to_js_error)
    }

    /// Vervang alle ballen door de posities uit een platte `[x, y, z, ...]` lijst.
    #[wasm_bindgen]
    pub fn update_balls(&mut self, positions: &[f64]) -> Result<(), JsValue> {
        let points = points_from_flat(positions).map_err(|err| js_error(&err))?;
        self.scene.update_balls(&points);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn ball_count(&self) -> usize {
        self.scene.ball_count()
    }

    /// Extraheer het isovlak als `{ positions, normals, indices, diagnostics }`.
    #[wasm_bindgen]
    pub fn generate(&mut self) -> Result<JsValue, JsValue> {
        let (mesh, diagnostics) = self.scene.generate_mesh();
        debug_log!("metaballs: {}", diagnostics.summary());
        to_js_value(&MeshExport::new(&mesh, Some(diagnostics)))
    }
}

/// Bemonster `divisions + 1` punten op een NURBS-curve als platte `[x, y, z, ...]` lijst.
#[wasm_bindgen]
pub fn sample_nurbs_curve(descriptor: JsValue, divisions: u32) -> Result<Vec<f64>, JsValue> {
    let descriptor: NurbsCurveDescriptor =
        serde_wasm_bindgen::from_value(descriptor).map_err(to_js_error)?;
    let curve = descriptor.into_curve().map_err(to_js_error)?;
    Ok(sample_curve_points(&curve, divisions as usize))
}

/// Trianguleer een NURBS-oppervlak als `{ positions, uvs, indices }`.
///
/// Met `swap_uv` worden de parameters verwisseld, zoals de demo zijn
/// oppervlakken bemonstert.
#[wasm_bindgen]
pub fn sample_nurbs_surface(
    descriptor: JsValue,
    slices: u32,
    stacks: u32,
    swap_uv: bool,
) -> Result<JsValue, JsValue> {
    let descriptor: NurbsSurfaceDescriptor =
        serde_wasm_bindgen::from_value(descriptor).map_err(to_js_error)?;
    let surface = descriptor.into_surface().map_err(to_js_error)?;
    let mesh = tessellate_surface(&surface, slices as usize, stacks as usize, swap_uv);
    to_js_value(&MeshExport::new(&mesh, None))
}

fn to_js_error<E: fmt::Display>(error: E) -> JsValue {
    js_error(&error.to_string())
}

fn js_error(message: &str) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    {
        JsError::new(message).into()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
        JsValue::NULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_descriptor_deserializes_from_camel_case() {
        let json = r#"{
            "degree": 1,
            "knots": [0, 0, 1, 1],
            "controlPoints": [[0, 0, 0, 1], [4, 2, 0, 1]]
        }"#;
        let descriptor: NurbsCurveDescriptor = serde_json::from_str(json).unwrap();
        let curve = descriptor.into_curve().unwrap();
        assert_eq!(
            sample_curve_points(&curve, 2),
            vec![0.0, 0.0, 0.0, 2.0, 1.0, 0.0, 4.0, 2.0, 0.0]
        );
    }

    #[test]
    fn invalid_curve_descriptor_reports_nurbs_error() {
        let descriptor = NurbsCurveDescriptor {
            degree: 2,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            control_points: vec![[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]],
        };
        assert!(matches!(
            descriptor.into_curve(),
            Err(NurbsError::TooFewControlPoints { required: 3, actual: 2 })
        ));
    }

    #[test]
    fn surface_export_carries_uvs_without_diagnostics() {
        let descriptor = NurbsSurfaceDescriptor {
            degree_u: 1,
            degree_v: 1,
            knots_u: vec![0.0, 0.0, 1.0, 1.0],
            knots_v: vec![0.0, 0.0, 1.0, 1.0],
            control_points: vec![
                vec![[0.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]],
                vec![[1.0, 0.0, 0.0, 1.0], [1.0, 1.0, 0.0, 1.0]],
            ],
        };
        let surface = descriptor.into_surface().unwrap();
        let mesh = tessellate_surface(&surface, 2, 2, true);
        let export = MeshExport::new(&mesh, None);
        assert_eq!(export.positions.len(), 9 * 3);
        assert_eq!(export.uvs.as_ref().map(Vec::len), Some(9 * 2));
        assert_eq!(export.indices.len(), 8 * 3);
        assert!(export.normals.is_none());
        assert!(export.diagnostics.is_none());

        // swapped: the second vertex advances along the surface's v direction
        assert_eq!(&export.positions[3..6], &[0.0, 0.5, 0.0]);
    }

    #[test]
    fn flat_positions_must_be_finite_triples() {
        assert_eq!(
            points_from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)]
        );
        assert!(points_from_flat(&[1.0, 2.0]).is_err());
        assert!(points_from_flat(&[1.0, f64::NAN, 3.0]).is_err());
    }

    #[test]
    fn metaball_export_serializes_diagnostics() {
        let mut scene = MetaballScene::new(MetaballOptions {
            resolution: 16,
            ball_size: 40.0,
            ..MetaballOptions::default()
        })
        .unwrap();
        scene.update_balls(&[Point3::ORIGIN]);
        let (mesh, diagnostics) = scene.generate_mesh();
        let export = MeshExport::new(&mesh, Some(diagnostics));

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["indices"].as_array().unwrap().len(), mesh.indices.len());
        assert_eq!(json["diagnostics"]["openEdgeCount"], 0);
        assert!(json.get("uvs").is_none());
    }
}
