//! Scalar helpers shared by the camera and texture code.

/// Linear interpolation from `a` toward `b` by `t`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamps `v` into `[min, max]`.
///
/// Unlike `f32::clamp` this never panics; with `min > max` the result is `max`.
#[inline]
pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Scale that makes an image of `image_aspect` cover a screen of `screen_aspect`
/// without distortion. Multiply UVs around the centre by the returned factors.
pub fn covered_scale(screen_aspect: f32, image_aspect: f32) -> [f32; 2] {
    if screen_aspect < image_aspect {
        [screen_aspect / image_aspect, 1.0]
    } else {
        [1.0, image_aspect / screen_aspect]
    }
}
