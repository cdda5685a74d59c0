//! Numerical quadrature used to normalize shape densities on an observable range.

/// Composite Simpson rule for `f` on `[lo, hi]`.
///
/// `intervals` is rounded up to the next even number (minimum 2).
pub fn simpson<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64, intervals: usize) -> f64 {
    let n = {
        let n = intervals.max(2);
        if n % 2 == 1 { n + 1 } else { n }
    };
    let h = (hi - lo) / n as f64;

    let mut acc = f(lo) + f(hi);
    for i in 1..n {
        let x = lo + h * i as f64;
        let coef = if i % 2 == 1 { 4.0 } else { 2.0 };
        acc += coef * f(x);
    }
    acc * h / 3.0
}
