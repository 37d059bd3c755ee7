//! Geometric primitives and the region types used for clip placement.
//!
//! Coordinates are pixels with `(0, 0)` at the top-left and `y` growing
//! downward. Source regions live in the clip's native content space;
//! destination regions live in the output frame.

use serde::{Deserialize, Serialize};

use montage_common::{approx_eq, Diagnostic, RegionRole};

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether this size has no usable area.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle at the origin covering `size`.
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// The center point of this rectangle.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Zero or negative area, or non-finite components.
    pub fn is_degenerate(&self) -> bool {
        let finite =
            self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite();
        !finite || self.w <= 0.0 || self.h <= 0.0
    }

    /// Whether `other` lies entirely inside this rectangle (within tolerance).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        let tol = 1e-9;
        other.x >= self.x - tol
            && other.y >= self.y - tol
            && other.right() <= self.right() + tol
            && other.bottom() <= self.bottom() + tol
    }

    /// Overlapping area of two rectangles, `None` if they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Whether two rectangles are equal within tolerance.
    pub fn approx_eq(&self, other: &Rect) -> bool {
        approx_eq(self.x, other.x)
            && approx_eq(self.y, other.y)
            && approx_eq(self.w, other.w)
            && approx_eq(self.h, other.h)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which part of the source content is shown.
///
/// `Full` stands for the entire source and is distinct from any explicit
/// rectangle, including a zero-sized one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRegion {
    #[default]
    Full,
    Rect(Rect),
}

/// Where in the output frame the source is placed.
///
/// `Full` stands for the entire destination frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DestRegion {
    #[default]
    Full,
    Rect(Rect),
}

/// A region resolved to a concrete rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRegion {
    pub rect: Rect,
    /// Set when the requested rectangle had to be intersected with its bounds.
    pub diagnostic: Option<Diagnostic>,
}

impl SourceRegion {
    /// Resolve against the source's native size, clamping to its bounds.
    pub fn resolve(&self, source_size: Size) -> ResolvedRegion {
        match self {
            SourceRegion::Full => ResolvedRegion {
                rect: Rect::from_size(source_size),
                diagnostic: None,
            },
            SourceRegion::Rect(rect) => {
                clamp_region(*rect, Rect::from_size(source_size), RegionRole::Source)
            }
        }
    }
}

impl DestRegion {
    /// Resolve against the output frame size, clamping to its bounds.
    pub fn resolve(&self, frame_size: Size) -> ResolvedRegion {
        match self {
            DestRegion::Full => ResolvedRegion {
                rect: Rect::from_size(frame_size),
                diagnostic: None,
            },
            DestRegion::Rect(rect) => {
                clamp_region(*rect, Rect::from_size(frame_size), RegionRole::Destination)
            }
        }
    }
}

fn clamp_region(requested: Rect, bounds: Rect, role: RegionRole) -> ResolvedRegion {
    // Degenerate requests pass through untouched; the resolver flags them.
    if requested.is_degenerate() || bounds.is_degenerate() || bounds.contains_rect(&requested) {
        return ResolvedRegion {
            rect: requested,
            diagnostic: None,
        };
    }

    let applied = requested.intersection(&bounds).unwrap_or(Rect::new(
        requested.x.clamp(0.0, bounds.w),
        requested.y.clamp(0.0, bounds.h),
        0.0,
        0.0,
    ));

    ResolvedRegion {
        rect: applied,
        diagnostic: Some(
            Diagnostic::RegionClamped {
                role,
                requested: requested.to_array(),
                applied: applied.to_array(),
            }
            .emitted(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_source_resolves_to_native_bounds() {
        let resolved = SourceRegion::Full.resolve(Size::new(1920.0, 1080.0));
        assert_eq!(resolved.rect, Rect::new(0.0, 0.0, 1920.0, 1080.0));
        assert!(resolved.diagnostic.is_none());
    }

    #[test]
    fn test_full_is_distinct_from_zero_rect() {
        let zero = SourceRegion::Rect(Rect::new(0.0, 0.0, 0.0, 0.0));
        assert_ne!(zero, SourceRegion::Full);
        let resolved = zero.resolve(Size::new(100.0, 100.0));
        assert!(resolved.rect.is_degenerate());
    }

    #[test]
    fn test_dest_region_clamped_to_frame() {
        let region = DestRegion::Rect(Rect::new(-10.0, 50.0, 110.0, 100.0));
        let resolved = region.resolve(Size::new(100.0, 100.0));
        assert!(resolved.rect.approx_eq(&Rect::new(0.0, 50.0, 100.0, 50.0)));
        assert!(matches!(
            resolved.diagnostic,
            Some(Diagnostic::RegionClamped {
                role: RegionRole::Destination,
                ..
            })
        ));
    }

    #[test]
    fn test_region_outside_bounds_collapses() {
        let region = SourceRegion::Rect(Rect::new(200.0, 200.0, 10.0, 10.0));
        let resolved = region.resolve(Size::new(100.0, 100.0));
        assert!(resolved.rect.is_degenerate());
        assert!(resolved.diagnostic.is_some());
    }

    #[test]
    fn test_region_serde_tagging() {
        let json = serde_json::to_string(&DestRegion::Full).unwrap();
        assert_eq!(json, r#"{"kind":"full"}"#);

        let rect: SourceRegion =
            serde_json::from_str(r#"{"kind":"rect","x":1.0,"y":2.0,"w":3.0,"h":4.0}"#).unwrap();
        assert_eq!(rect, SourceRegion::Rect(Rect::new(1.0, 2.0, 3.0, 4.0)));
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert!(a.intersection(&Rect::new(20.0, 0.0, 1.0, 1.0)).is_none());
    }
}
