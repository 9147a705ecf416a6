/// Drawable rectangle in device (physical) pixels, origin bottom-left.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ViewportRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Full-surface rect for a logical size and device pixel ratio.
    ///
    /// Each product is rounded toward zero; negative or non-finite products
    /// become zero. Products within float noise of an integer snap to it, so
    /// a physical size divided by the scale factor maps back to itself.
    pub fn from_logical(width: f64, height: f64, scale_factor: f64) -> Self {
        Self::new(0, 0, to_device(width, scale_factor), to_device(height, scale_factor))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; 1.0 for an empty rect.
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Intersects with a `(0, 0, width, height)` surface.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

const SNAP_EPSILON: f64 = 1e-6;

fn to_device(logical: f64, scale_factor: f64) -> u32 {
    let product = logical * scale_factor;
    let nearest = product.round();
    let v = if (product - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        product.trunc()
    };
    if v.is_finite() && v > 0.0 {
        v.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_logical_rounds_toward_zero() {
        assert_eq!(ViewportRect::from_logical(800.0, 600.0, 1.0), ViewportRect::new(0, 0, 800, 600));
        assert_eq!(ViewportRect::from_logical(800.0, 600.0, 2.0), ViewportRect::new(0, 0, 1600, 1200));
        assert_eq!(ViewportRect::from_logical(333.0, 101.0, 1.5), ViewportRect::new(0, 0, 499, 151));
    }

    #[test]
    fn physical_size_survives_the_logical_round_trip() {
        let r = ViewportRect::from_logical(61.0 / 1.75, 115.0 / 1.75, 1.75);
        assert_eq!(r, ViewportRect::new(0, 0, 61, 115));
        let r = ViewportRect::from_logical(1001.0 / 1.25, 7.0 / 1.1, 1.25);
        assert_eq!(r.width, 1001);
    }

    #[test]
    fn degenerate_inputs_clamp_to_zero() {
        assert!(ViewportRect::from_logical(-5.0, 10.0, 1.0).is_empty());
        assert!(ViewportRect::from_logical(f64::NAN, 10.0, 1.0).is_empty());
        assert!(ViewportRect::from_logical(10.0, 10.0, f64::INFINITY).is_empty());
    }

    #[test]
    fn clamp_to_surface() {
        let r = ViewportRect::new(10, 10, 100, 100).clamp_to(50, 200);
        assert_eq!(r, ViewportRect::new(10, 10, 40, 100));
        assert!(ViewportRect::new(80, 0, 10, 10).clamp_to(50, 50).is_empty());
    }

    #[test]
    fn aspect_of_empty_rect_is_one() {
        assert_eq!(ViewportRect::default().aspect(), 1.0);
        assert_eq!(ViewportRect::new(0, 0, 200, 100).aspect(), 2.0);
    }
}
