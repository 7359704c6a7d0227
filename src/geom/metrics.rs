//! Opt-in timing hooks for the geometry engine.
//!
//! Timing is only collected when the `mesh_engine_metrics` feature is enabled
//! and the target is not WASM (`std::time::Instant` is unavailable there).
//! Otherwise every call compiles down to running the closure.
//!
//! # Usage
//!
//! ```ignore
//! use organic_engine::geom::{GeomMetrics, TimingBucket};
//!
//! let mut metrics = GeomMetrics::default();
//! metrics.begin();
//!
//! let soup = metrics.time(TimingBucket::Extraction, || cubes.generate_geometry());
//!
//! if let Some(report) = metrics.end() {
//!     println!("Extraction: {} ns", report.extraction_ns);
//! }
//! ```

/// Categories for timing the phases of mesh generation.
///
/// Each bucket accumulates time across multiple calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Resetting the scalar field and adding ball and plane contributions.
    FieldAccumulation,
    /// Marching-cubes polygonization.
    Extraction,
    /// Vertex welding of the extracted triangle soup.
    Welding,
    /// Diagnostics computation (open and non-manifold edges).
    Diagnostics,
    /// NURBS curve point sampling.
    CurveEvaluation,
    /// NURBS surface grid sampling and triangulation.
    SurfaceTessellation,
}

/// Timing report with nanosecond precision for each bucket.
///
/// All fields are cumulative.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeomTimingReport {
    pub field_accumulation_ns: u64,
    pub extraction_ns: u64,
    pub welding_ns: u64,
    pub diagnostics_ns: u64,
    pub curve_evaluation_ns: u64,
    pub surface_tessellation_ns: u64,
}

impl GeomTimingReport {
    /// Returns the total time across all buckets in nanoseconds.
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.field_accumulation_ns
            .saturating_add(self.extraction_ns)
            .saturating_add(self.welding_ns)
            .saturating_add(self.diagnostics_ns)
            .saturating_add(self.curve_evaluation_ns)
            .saturating_add(self.surface_tessellation_ns)
    }

    /// Returns the total time in milliseconds (for display purposes).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    fn bucket_mut(&mut self, bucket: TimingBucket) -> &mut u64 {
        match bucket {
            TimingBucket::FieldAccumulation => &mut self.field_accumulation_ns,
            TimingBucket::Extraction => &mut self.extraction_ns,
            TimingBucket::Welding => &mut self.welding_ns,
            TimingBucket::Diagnostics => &mut self.diagnostics_ns,
            TimingBucket::CurveEvaluation => &mut self.curve_evaluation_ns,
            TimingBucket::SurfaceTessellation => &mut self.surface_tessellation_ns,
        }
    }

    /// Adds nanoseconds to `bucket`, saturating at `u64::MAX`.
    pub fn add(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = self.bucket_mut(bucket);
        *slot = slot.saturating_add(nanos);
    }
}

/// Accumulator for timing geometry operations.
///
/// Call [`begin`](Self::begin) to reset, wrap operations with
/// [`time`](Self::time), and call [`end`](Self::end) to retrieve the report.
/// When metrics are disabled [`end`](Self::end) returns `None`.
#[derive(Debug, Default)]
pub struct GeomMetrics {
    #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
    report: GeomTimingReport,
}

impl GeomMetrics {
    /// Resets all timing counters to zero.
    pub fn begin(&mut self) {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            self.report = GeomTimingReport::default();
        }
    }

    /// Returns the accumulated timing report, or `None` if metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<GeomTimingReport> {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Times `f` and accumulates the elapsed time in `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
            self.report.add(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}
