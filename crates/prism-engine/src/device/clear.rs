use crate::math::clamp;

/// Straight-alpha RGBA used to clear the colour attachment every frame.
///
/// Invariant: every channel lies in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    /// Creates a clear colour, clamping each channel to `[0, 1]`.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        let c = |v: f32| clamp(v, 0.0, 1.0);
        Self { r: c(r), g: c(g), b: c(b), a: c(a) }
    }

    /// Parses `#rrggbb` / `rrggbb` (or the 3-digit short form), keeping `self.a`.
    ///
    /// Returns `None` for anything else.
    pub fn with_hex(self, hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };

        let channel = |i: usize| -> Option<f32> {
            let byte = u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok()?;
            Some(byte as f32 / 255.0)
        };

        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: self.a,
        })
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_channels() {
        let c = ClearColor::new(1.5, -0.2, 0.5, 2.0);
        assert_eq!(c, ClearColor { r: 1.0, g: 0.0, b: 0.5, a: 1.0 });
    }

    #[test]
    fn hex_long_form() {
        let c = ClearColor::new(0.0, 0.0, 0.0, 0.5).with_hex("#ff0080").unwrap();
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn hex_short_form_without_hash() {
        let c = ClearColor::WHITE.with_hex("0f0").unwrap();
        assert_eq!((c.r, c.g, c.b), (0.0, 1.0, 0.0));
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(ClearColor::WHITE.with_hex("#12345").is_none());
        assert!(ClearColor::WHITE.with_hex("#gggggg").is_none());
    }
}
