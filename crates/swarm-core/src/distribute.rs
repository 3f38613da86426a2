//! Spawn layouts for teams and resource deposits.

use crate::vector::Vector;

const FULL_TURN: f64 = std::f64::consts::TAU;

/// `count` points evenly spaced on a circle of `radius` around `center`.
#[must_use]
pub fn circular(count: usize, center: Vector, radius: f64) -> Vec<Vector> {
    (0..count)
        .map(|idx| {
            let theta = FULL_TURN * idx as f64 / count as f64;
            center + Vector::new(theta.cos(), theta.sin()) * radius
        })
        .collect()
}

/// `count` points evenly spaced on `y = slope * x + intercept` for `x` in `[0, length]`.
#[must_use]
pub fn linear(count: usize, length: f64, slope: f64, intercept: f64) -> Vec<Vector> {
    match count {
        0 => Vec::new(),
        1 => vec![Vector::new(0.0, intercept)],
        _ => {
            let step = length / (count - 1) as f64;
            (0..count)
                .map(|idx| {
                    let x = step * idx as f64;
                    Vector::new(x, slope * x + intercept)
                })
                .collect()
        }
    }
}

/// Interior points of a linear layout: `count` points with both endpoints dropped.
#[must_use]
pub fn linear_interior(count: usize, length: f64, slope: f64, intercept: f64) -> Vec<Vector> {
    let mut points = linear(count + 2, length, slope, intercept);
    points.pop();
    if !points.is_empty() {
        points.remove(0);
    }
    points
}
