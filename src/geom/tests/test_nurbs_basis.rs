use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{basis_function_derivatives, basis_functions, binomial, find_span};

const CUBIC_KNOTS: [f64; 11] = [0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 4.0, 4.0];
const QUADRATIC_KNOTS: [f64; 11] = [0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 5.0, 5.0];

#[test]
fn basis_functions_partition_unity() {
    let mut rng = StdRng::seed_from_u64(7);
    for (p, knots) in [(3, &CUBIC_KNOTS[..]), (2, &QUADRATIC_KNOTS[..])] {
        let last = knots[knots.len() - 1];
        for _ in 0..200 {
            let u = rng.random_range(0.0..=last);
            let span = find_span(p, u, knots);
            let n = basis_functions(span, u, p, knots);
            assert_eq!(n.len(), p + 1);
            let sum: f64 = n.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum {sum} at u={u}");
            assert!(n.iter().all(|v| *v >= -1e-15));
        }
    }
}

#[test]
fn find_span_brackets_parameter_and_is_monotone() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut samples: Vec<f64> = (0..300).map(|_| rng.random_range(0.0..5.0)).collect();
    samples.sort_by(f64::total_cmp);

    let p = 2;
    let n = QUADRATIC_KNOTS.len() - p - 1;
    let mut previous = p;
    for u in samples {
        let span = find_span(p, u, &QUADRATIC_KNOTS);
        assert!((p..n).contains(&span));
        assert!(QUADRATIC_KNOTS[span] <= u && u < QUADRATIC_KNOTS[span + 1]);
        assert!(span >= previous);
        previous = span;
    }
}

#[test]
fn find_span_skips_repeated_interior_knots() {
    // u = 4 sits on a double knot; the span must have non-zero length
    let span = find_span(2, 4.0, &QUADRATIC_KNOTS);
    assert_eq!(span, 7);
    assert!(QUADRATIC_KNOTS[span] < QUADRATIC_KNOTS[span + 1]);
}

#[test]
fn out_of_domain_parameters_clamp_to_end_spans() {
    assert_eq!(find_span(3, -2.0, &CUBIC_KNOTS), 3);
    assert_eq!(find_span(3, 4.0, &CUBIC_KNOTS), 6);
    assert_eq!(find_span(3, 9.0, &CUBIC_KNOTS), 6);
}

#[test]
fn nurbs_book_example_values() {
    // NURBS Book Ex2.3: U = {0,0,0,1,2,3,4,4,5,5,5}, p = 2, u = 5/2
    let u = 2.5;
    let span = find_span(2, u, &QUADRATIC_KNOTS);
    assert_eq!(span, 4);
    let n = basis_functions(span, u, 2, &QUADRATIC_KNOTS);
    let expected = [0.125, 0.75, 0.125];
    for (got, want) in n.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12);
    }

    let ders = basis_function_derivatives(span, u, 2, 2, &QUADRATIC_KNOTS);
    let first = [-0.5, 0.0, 0.5];
    let second = [1.0, -2.0, 1.0];
    for j in 0..3 {
        assert!((ders[1][j] - first[j]).abs() < 1e-12);
        assert!((ders[2][j] - second[j]).abs() < 1e-12);
    }
}

#[test]
fn derivative_rows_match_finite_differences() {
    let p = 3;
    let u = 1.7;
    let h = 1e-6;
    let span = find_span(p, u, &CUBIC_KNOTS);
    let ders = basis_function_derivatives(span, u, p, 1, &CUBIC_KNOTS);
    let lo = basis_functions(span, u - h, p, &CUBIC_KNOTS);
    let hi = basis_functions(span, u + h, p, &CUBIC_KNOTS);
    for j in 0..=p {
        let fd = (hi[j] - lo[j]) / (2.0 * h);
        assert!((ders[1][j] - fd).abs() < 1e-6, "j={j}: {} vs {fd}", ders[1][j]);
    }
}

#[test]
fn binomial_row_sums_are_powers_of_two() {
    for k in 0..10usize {
        let sum: f64 = (0..=k).map(|i| binomial(k, i)).sum();
        assert_eq!(sum, f64::from(1u32 << k));
    }
}
