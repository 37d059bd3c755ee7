//! Placement of a clip's source content in the output frame.
//!
//! The resolver maps the resolved source region onto the resolved
//! destination region according to the clip's [`ScalingMode`], then rotates
//! the result about the destination center. Coordinates are pixels with `y`
//! growing downward, so a positive rotation turns clockwise on screen.

use serde::Serialize;

use montage_common::{approx_eq, Diagnostic};
use montage_project_model::clip::{Clip, ScalingMode};
use montage_project_model::region::{Point2D, Rect, Size};

/// A 2D affine transform.
///
/// ```text
/// x' = a * x + c * y + tx
/// y' = b * x + d * y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Affine2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Rotation by `radians` about `pivot`.
    pub fn rotation_about(radians: f64, pivot: Point2D) -> Self {
        Self::translation(-pivot.x, -pivot.y)
            .then(&Self::rotation(radians))
            .then(&Self::translation(pivot.x, pivot.y))
    }

    /// Apply `self` first, then `next`.
    pub fn then(&self, next: &Affine2D) -> Affine2D {
        Affine2D {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            tx: next.a * self.tx + next.c * self.ty + next.tx,
            ty: next.b * self.tx + next.d * self.ty + next.ty,
        }
    }

    pub fn apply(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Inverse transform, `None` when singular.
    pub fn inverse(&self) -> Option<Affine2D> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Affine2D {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        })
    }

    pub fn approx_eq(&self, other: &Affine2D) -> bool {
        approx_eq(self.a, other.a)
            && approx_eq(self.b, other.b)
            && approx_eq(self.c, other.c)
            && approx_eq(self.d, other.d)
            && approx_eq(self.tx, other.tx)
            && approx_eq(self.ty, other.ty)
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY)
    }
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Result of placing one source rectangle into one destination rectangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    /// Maps source-content pixels to output pixels.
    pub transform: Affine2D,
    /// Where the scaled source lands before rotation.
    pub placed: Rect,
    /// Part of `placed` inside the destination; what should be drawn.
    pub visible: Rect,
    /// Part of the source region that ends up in `visible`.
    pub visible_source: Rect,
    /// Source or destination had no area; `transform` is the identity.
    pub degenerate: bool,
}

/// Placement of a clip, plus any region clamps that were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipPlacement {
    pub source: Rect,
    pub dest: Rect,
    pub placement: Placement,
    pub diagnostics: Vec<Diagnostic>,
}

/// Stateless geometry resolution.
pub struct GeometryResolver;

impl GeometryResolver {
    /// Map `source` onto `dest` using `mode`, then rotate about the center
    /// of `dest`.
    ///
    /// Never fails: if either rectangle has no area the result is the
    /// identity with `degenerate` set.
    pub fn resolve(source: Rect, dest: Rect, mode: ScalingMode, rotation: f64) -> Placement {
        if source.is_degenerate() || dest.is_degenerate() {
            return Placement {
                transform: Affine2D::IDENTITY,
                placed: dest,
                visible: dest,
                visible_source: source,
                degenerate: true,
            };
        }

        let (sx, sy) = scale_factors(source.size(), dest.size(), mode);
        let center = dest.center();
        let placed_w = source.w * sx;
        let placed_h = source.h * sy;
        let placed = Rect::new(
            center.x - placed_w / 2.0,
            center.y - placed_h / 2.0,
            placed_w,
            placed_h,
        );

        let rotation = if rotation.is_finite() { rotation } else { 0.0 };
        let transform = Affine2D::translation(-source.x, -source.y)
            .then(&Affine2D::scaling(sx, sy))
            .then(&Affine2D::translation(placed.x, placed.y))
            .then(&Affine2D::rotation_about(rotation, center));

        let visible = placed.intersection(&dest).unwrap_or(Rect::new(center.x, center.y, 0.0, 0.0));
        let visible_source = Rect::new(
            source.x + (visible.x - placed.x) / sx,
            source.y + (visible.y - placed.y) / sy,
            visible.w / sx,
            visible.h / sy,
        );

        Placement {
            transform,
            placed,
            visible,
            visible_source,
            degenerate: false,
        }
    }

    /// Resolve a clip's regions and place it in a frame of `render_size`.
    pub fn resolve_clip(clip: &Clip, render_size: Size) -> ClipPlacement {
        let source = clip.source_region().resolve(clip.source_size());
        let dest = clip.dest_region().resolve(render_size);
        let diagnostics = source
            .diagnostic
            .into_iter()
            .chain(dest.diagnostic)
            .collect();

        let placement = Self::resolve(source.rect, dest.rect, clip.scaling_mode(), clip.rotation());
        if placement.degenerate {
            tracing::debug!(id = clip.id(), "Degenerate clip geometry, using identity");
        }

        ClipPlacement {
            source: source.rect,
            dest: dest.rect,
            placement,
            diagnostics,
        }
    }
}

fn scale_factors(source: Size, dest: Size, mode: ScalingMode) -> (f64, f64) {
    let sx = dest.width / source.width;
    let sy = dest.height / source.height;
    match mode {
        ScalingMode::None => (1.0, 1.0),
        ScalingMode::Fit => {
            let s = sx.min(sy);
            (s, s)
        }
        ScalingMode::Fill => {
            let s = sx.max(sy);
            (s, s)
        }
        ScalingMode::Stretch => (sx, sy),
    }
}
