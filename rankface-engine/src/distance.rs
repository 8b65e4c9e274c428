//! Vector distance formulas.
//!
//! Every function returns a distance: 0 for identical inputs, larger for
//! further apart. Zero-norm inputs to `cosine` and `correlation` yield NaN.

use ndarray::Array1;

pub fn cosine(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    let uv = u.dot(v);
    let uu = u.dot(u);
    let vv = v.dot(v);
    (1.0 - uv / (uu * vv).sqrt()).clamp(0.0, 2.0)
}

pub fn correlation(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    let u = u - u.mean().unwrap_or(0.0);
    let v = v - v.mean().unwrap_or(0.0);
    cosine(&u, &v)
}

pub fn braycurtis(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    let num: f64 = u.iter().zip(v).map(|(a, b)| (a - b).abs()).sum();
    let den: f64 = u.iter().zip(v).map(|(a, b)| (a + b).abs()).sum();
    num / den
}

/// Terms where both components are zero contribute nothing.
pub fn canberra(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    u.iter()
        .zip(v)
        .map(|(a, b)| {
            let den = a.abs() + b.abs();
            if den == 0.0 {
                0.0
            } else {
                (a - b).abs() / den
            }
        })
        .sum()
}

pub fn chebyshev(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    u.iter()
        .zip(v)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

pub fn cityblock(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    u.iter().zip(v).map(|(a, b)| (a - b).abs()).sum()
}

pub fn sqeuclidean(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    u.iter().zip(v).map(|(a, b)| (a - b) * (a - b)).sum()
}

pub fn euclidean(u: &Array1<f64>, v: &Array1<f64>) -> f64 {
    sqeuclidean(u, v).sqrt()
}

pub fn minkowski(u: &Array1<f64>, v: &Array1<f64>, p: f64) -> f64 {
    let sum: f64 = u.iter().zip(v).map(|(a, b)| (a - b).abs().powf(p)).sum();
    sum.powf(1.0 / p)
}
