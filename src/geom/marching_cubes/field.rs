//! Voxel scalar field with additive metaball and plane contributions.

use crate::geom::core::Vec3;

/// Cubic grid of `resolution³` samples stored x-fastest, then y, then z.
///
/// Contributions are accumulated into the field between [`ScalarField::reset`]
/// calls. Gradients are estimated by central differences on first request
/// and cached until the next reset, so every contribution for a frame must be
/// added before the first gradient is read.
#[derive(Debug, Clone)]
pub struct ScalarField {
    size: usize,
    size2: usize,
    halfsize: f64,
    delta: f64,
    values: Vec<f64>,
    gradients: Vec<Vec3>,
    gradient_valid: Vec<bool>,
}

impl ScalarField {
    /// Allocates a zeroed field. Resolutions below 4 hold no interior cubes.
    #[must_use]
    pub fn new(resolution: usize) -> Self {
        let size = resolution;
        let size2 = size * size;
        let size3 = size2 * size;
        Self {
            size,
            size2,
            halfsize: size as f64 / 2.0,
            delta: 2.0 / size as f64,
            values: vec![0.0; size3],
            gradients: vec![Vec3::ZERO; size3],
            gradient_valid: vec![false; size3],
        }
    }

    #[must_use]
    pub fn resolution(&self) -> usize {
        self.size
    }

    /// Stride between neighbouring samples along y.
    #[must_use]
    pub fn yd(&self) -> usize {
        self.size
    }

    /// Stride between neighbouring samples along z.
    #[must_use]
    pub fn zd(&self) -> usize {
        self.size2
    }

    #[must_use]
    pub fn halfsize(&self) -> f64 {
        self.halfsize
    }

    /// Edge length of one cell in the `[-1, 1]` extraction cube.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.size2 + y * self.size + x
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f64 {
        self.values[self.index(x, y, z)]
    }

    #[must_use]
    pub(crate) fn value_at(&self, q: usize) -> f64 {
        self.values[q]
    }

    /// Overwrites one sample. Cached gradients are left untouched.
    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: f64) {
        let q = self.index(x, y, z);
        self.values[q] = value;
    }

    /// Zeroes every sample and invalidates every cached gradient.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.gradient_valid.fill(false);
    }

    /// Central-difference gradient at sample `q`, computed once per reset.
    ///
    /// Points from higher to lower field values; `q` must not lie on the
    /// outer shell of the grid.
    pub fn gradient(&mut self, q: usize) -> Vec3 {
        if !self.gradient_valid[q] {
            let f = &self.values;
            let (yd, zd) = (self.size, self.size2);
            self.gradients[q] = Vec3::new(
                f[q - 1] - f[q + 1],
                f[q - yd] - f[q + yd],
                f[q - zd] - f[q + zd],
            );
            self.gradient_valid[q] = true;
        }
        self.gradients[q]
    }

    /// Adds a reciprocal ball centred at `(ball_x, ball_y, ball_z)` in
    /// normalized `[0, 1]` grid space.
    ///
    /// The contribution `strength / (1e-6 + d²) - subtract` reaches zero at
    /// `d = sqrt(strength / subtract)`, so only cells inside that radius are
    /// visited, and only positive values are added. The outer shell of the
    /// grid is never written.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::similar_names
    )]
    pub fn add_ball(&mut self, ball_x: f64, ball_y: f64, ball_z: f64, strength: f64, subtract: f64) {
        let size = self.size as f64;
        let radius = size * (strength / subtract).sqrt();
        if radius.is_nan() {
            return;
        }

        let upper = size - 1.0;
        let bounds = |center: f64| {
            let scaled = center * size;
            let lo = (scaled - radius).floor().max(1.0);
            let hi = (scaled + radius).floor().min(upper);
            (lo as usize, hi as usize)
        };
        let (min_x, max_x) = bounds(ball_x);
        let (min_y, max_y) = bounds(ball_y);
        let (min_z, max_z) = bounds(ball_z);

        for z in min_z..max_z {
            let z_offset = self.size2 * z;
            let fz = z as f64 / size - ball_z;
            let fz2 = fz * fz;
            for y in min_y..max_y {
                let y_offset = z_offset + self.size * y;
                let fy = y as f64 / size - ball_y;
                let fy2 = fy * fy;
                for x in min_x..max_x {
                    let fx = x as f64 / size - ball_x;
                    let val = strength / (0.000_001 + fx * fx + fy2 + fz2) - subtract;
                    if val > 0.0 {
                        self.values[y_offset + x] += val;
                    }
                }
            }
        }
    }

    /// Adds a slab decaying away from the `x = 0` face across every `(y, z)`.
    pub fn add_plane_x(&mut self, strength: f64, subtract: f64) {
        self.add_plane(1, self.size, self.size2, strength, subtract);
    }

    /// Adds a slab decaying away from the `y = 0` face across every `(x, z)`.
    pub fn add_plane_y(&mut self, strength: f64, subtract: f64) {
        self.add_plane(self.size, 1, self.size2, strength, subtract);
    }

    /// Adds a slab decaying away from the `z = 0` face across every `(x, y)`.
    pub fn add_plane_z(&mut self, strength: f64, subtract: f64) {
        self.add_plane(self.size2, 1, self.size, strength, subtract);
    }

    /// Shared plane sweep: `along` is the stride of the decay axis, `across_a`
    /// and `across_b` span the orthogonal layer.
    fn add_plane(&mut self, along: usize, across_a: usize, across_b: usize, strength: f64, subtract: f64) {
        let size = self.size as f64;
        let dist = (size * (strength / subtract).sqrt()).min(size);

        for i in (0..self.size).take_while(|i| (*i as f64) < dist) {
            let div = i as f64 / size;
            let val = strength / (0.0001 + div * div) - subtract;
            if val <= 0.0 {
                continue;
            }
            let base = i * along;
            for a in 0..self.size {
                let row = base + a * across_a;
                for b in 0..self.size {
                    self.values[row + b * across_b] += val;
                }
            }
        }
    }
}
