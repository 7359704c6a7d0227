//! B-spline basis machinery shared by curve and surface evaluation.
//!
//! These are the unchecked kernels: knot vectors are assumed non-decreasing
//! and parameters are expected inside `[U[0], U[last]]`. Out-of-domain
//! parameters are clamped by [`find_span`] and nowhere else.

/// Returns the knot span index containing `u`.
///
/// With `n = knots.len() - p - 1`, the result always lies in `[p, n - 1]`:
/// `u >= U[n]` maps to the last span, `u <= U[p]` to the first, and anything
/// else is located by binary search so that `U[i] <= u < U[i + 1]`.
#[must_use]
pub fn find_span(p: usize, u: f64, knots: &[f64]) -> usize {
    debug_assert!(knots.len() > 2 * p + 1, "knot vector too short for degree {p}");
    let n = knots.len() - p - 1;

    if u >= knots[n] {
        return n - 1;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Evaluates the `p + 1` non-vanishing basis functions at `u` in `span`.
///
/// Bottom-up triangular recurrence; the values sum to one.
#[must_use]
pub fn basis_functions(span: usize, u: f64, p: usize, knots: &[f64]) -> Vec<f64> {
    let mut n = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    n[0] = 1.0;

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;

        let mut saved = 0.0;
        for r in 0..j {
            let rv = right[r + 1];
            let lv = left[j - r];
            let temp = n[r] / (rv + lv);
            n[r] = saved + rv * temp;
            saved = lv * temp;
        }
        n[j] = saved;
    }

    n
}

/// Derivatives `0..=n` of the `p + 1` non-vanishing basis functions at `u`.
///
/// Returns an `(n + 1) × (p + 1)` table where row `k` holds the `k`-th
/// derivatives. Orders above `p` vanish for a degree-`p` piece; they are
/// returned as zero rows and never touch the recurrence tables.
#[must_use]
pub fn basis_function_derivatives(
    span: usize,
    u: f64,
    p: usize,
    n: usize,
    knots: &[f64],
) -> Vec<Vec<f64>> {
    let du = n.min(p);
    let mut ders = vec![vec![0.0; p + 1]; n + 1];

    // ndu stores basis values in the upper triangle and knot differences in
    // the lower one.
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    ndu[0][0] = 1.0;

    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;

        let mut saved = 0.0;
        for r in 0..j {
            let rv = right[r + 1];
            let lv = left[j - r];
            ndu[j][r] = rv + lv;

            let temp = ndu[r][j - 1] / ndu[j][r];
            ndu[r][j] = saved + rv * temp;
            saved = lv * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let mut a = [vec![0.0; p + 1], vec![0.0; p + 1]];
    for r in 0..=p {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0].fill(0.0);
        a[1].fill(0.0);
        a[0][0] = 1.0;

        for k in 1..=du {
            let mut d = 0.0;
            let pk = p - k;

            if r >= k {
                let rk = r - k;
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk];
                d = a[s2][0] * ndu[rk][pk];
            }

            // j1 = max(1, k - r), j2 = min(k - 1, p - r)
            let j1 = if r + 1 >= k { 1 } else { k - r };
            let j2 = if r <= pk + 1 { k - 1 } else { p - r };

            for j in j1..=j2 {
                // r + j >= k holds for every j in range
                let rkj = r + j - k;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][rkj];
                d += a[s2][j] * ndu[rkj][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    // Multiply through by p! / (p - k)!
    let mut factor = p as f64;
    for k in 1..=du {
        for value in &mut ders[k] {
            *value *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Binomial coefficient `k! / (i! (k - i)!)` via factorial ratios.
///
/// Exact for the small derivative orders used during evaluation.
#[must_use]
pub fn binomial(k: usize, i: usize) -> f64 {
    if i > k {
        return 0.0;
    }
    let factorial = |m: usize| (2..=m).fold(1.0_f64, |acc, j| acc * j as f64);
    factorial(k) / (factorial(i) * factorial(k - i))
}
