use nalgebra as na;
use num_traits::Float;

/// Rotates `pt` around `origin` by `angle` radians.
pub fn rotate_around<T: na::RealField + Float>(
    pt: na::Point2<T>,
    origin: na::Point2<T>,
    angle: T,
) -> na::Point2<T> {
    let (sin, cos) = Float::sin_cos(angle);
    let d = pt - origin;

    origin + na::Vector2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}

/// Mean per-step displacement over the last `window` points.
pub fn finite_difference<T: na::RealField + Float>(
    points: &[na::Point2<T>],
    window: usize,
) -> Option<na::Vector2<T>> {
    let n = window.min(points.len());
    if n < 2 {
        return None;
    }

    let recent = &points[points.len() - n..];
    let steps = T::from(n - 1)?;

    Some((recent[n - 1] - recent[0]) / steps)
}

/// Degrees offset of the `k`-th alternative mode: +s, -s, +2s, -2s, ...
pub fn mode_angle<T: Float>(k: usize, step_deg: T) -> Option<T> {
    if k == 0 {
        return T::from(0.0);
    }

    let magnitude = T::from((k + 1) / 2)? * step_deg;
    let angle = if k % 2 == 1 { magnitude } else { -magnitude };

    Some(angle.to_radians())
}
