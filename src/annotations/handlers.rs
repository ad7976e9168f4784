//! Handle actions
//!
//! Maps pointer drags on a handle to shape edits. Drags are always computed
//! from the shape as it was when the drag began, so every update is absolute
//! and cancelling simply restores that snapshot.

use super::handles::{Handle, ResizeHandle};
use crate::domain::{AnchorStyle, Point, Shape, ShapeBody, ShapeTransform};
use crate::error::{EditorError, EditorResult};

/// Smallest local extent a resize may produce
const MIN_EXTENT: f32 = 1.0;
/// Rotation snap increment (degrees) while shift is held
const ROTATION_SNAP: f32 = 45.0;

/// Modifier keys that change drag behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragModifiers {
    pub shift: bool,
}

/// What a drag acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    /// Move the whole shape
    Body,
    Handle(Handle),
}

/// An in-flight pointer drag
#[derive(Debug, Clone)]
pub struct DragSession {
    pub shape_id: String,
    pub target: DragTarget,
    /// Scene position where the drag began
    pub origin: Point,
    /// Shape state at the start of the drag
    pub snapshot: Shape,
}

impl DragSession {
    pub fn begin(shape: &Shape, target: DragTarget, origin: Point) -> Self {
        Self {
            shape_id: shape.id.clone(),
            target,
            origin,
            snapshot: shape.clone(),
        }
    }

    /// Recompute `shape` for the pointer at `scene`. A rejected update leaves
    /// `shape` untouched.
    pub fn update(&self, shape: &mut Shape, scene: Point, modifiers: DragModifiers) -> EditorResult<()> {
        if !scene.is_finite() {
            return Err(EditorError::geometry("pointer position is not finite"));
        }
        let mut next = self.snapshot.clone();
        match self.target {
            DragTarget::Body => {
                let mut transform = next.transform;
                transform.translation = transform.translation + (scene - self.origin);
                next.set_transform(transform)?;
            }
            DragTarget::Handle(Handle::Endpoint(end)) => next.move_arrow_endpoint(end, scene)?,
            DragTarget::Handle(Handle::Bend) => drag_bend(&mut next, scene, modifiers)?,
            DragTarget::Handle(Handle::Resize(r)) => resize(&mut next, r, scene)?,
            DragTarget::Handle(Handle::Rotate) => rotate(&mut next, self.origin, scene, modifiers)?,
            DragTarget::Handle(Handle::Delete | Handle::Confirm) => return Ok(()),
        }
        next.validate()?;
        // Keep the double-click clock that the press updated after the snapshot
        next.last_bend_press_ms = shape.last_bend_press_ms;
        *shape = next;
        Ok(())
    }

    /// Restore the shape to its state at the start of the drag
    pub fn cancel(self, shape: &mut Shape) {
        let last_press = shape.last_bend_press_ms;
        *shape = self.snapshot;
        shape.last_bend_press_ms = last_press;
    }
}

/// Register a press on the bend handle at `now_ms`. Returns true when the
/// press completes a double click, in which case the bend has been reset.
pub fn press_bend(shape: &mut Shape, now_ms: u64, window_ms: u64) -> bool {
    let double = shape
        .last_bend_press_ms
        .is_some_and(|last| now_ms.saturating_sub(last) < window_ms);
    if double {
        shape.last_bend_press_ms = None;
        if let Some(body) = shape.as_arrow_mut() {
            body.bend = Point::ZERO;
        }
        shape.refresh_extent();
        log::debug!("Reset bend of {}", shape.id);
    } else {
        shape.last_bend_press_ms = Some(now_ms);
    }
    double
}

fn drag_bend(shape: &mut Shape, scene: Point, modifiers: DragModifiers) -> EditorResult<()> {
    let local = shape.to_local(scene)?;
    let Some(body) = shape.as_arrow_mut() else {
        return Err(EditorError::geometry("shape is not an arrow"));
    };
    body.bend = if modifiers.shift && body.anchor_style == AnchorStyle::Straight {
        body.snapped_l_bend(local)
    } else {
        local - body.chord_mid()
    };
    shape.refresh_extent();
    Ok(())
}

/// Scale the shape so the dragged handle follows the pointer while the
/// opposite handle stays put. Corners scale uniformly.
fn resize(shape: &mut Shape, handle: ResizeHandle, scene: Point) -> EditorResult<()> {
    let local = shape.to_local(scene)?;
    let bounds = shape.local_bounds();
    let (w, h) = (bounds.width(), bounds.height());
    if !(w > 0.0 && h > 0.0) {
        return Err(EditorError::geometry("cannot resize an empty shape"));
    }
    let (dx, dy) = handle.direction();
    let (ox, oy) = handle.opposite().direction();
    let center = bounds.center();
    let anchor = Point::new(center.x + ox * w * 0.5, center.y + oy * h * 0.5);

    // Growth ratios along each axis in local units
    let mut rx = if dx != 0.0 {
        ((local.x - anchor.x) * dx / w).max(MIN_EXTENT / w)
    } else {
        1.0
    };
    let mut ry = if dy != 0.0 {
        ((local.y - anchor.y) * dy / h).max(MIN_EXTENT / h)
    } else {
        1.0
    };
    if handle.is_corner() || matches!(shape.body, ShapeBody::NumberMarker(_)) {
        let r = if dx == 0.0 {
            ry
        } else if dy == 0.0 {
            rx
        } else {
            rx.max(ry)
        };
        rx = r;
        ry = r;
    }

    let anchor_scene = shape.matrix().apply(anchor);
    if let ShapeBody::MagnifierView(body) = &mut shape.body {
        // Views grow by magnification; their extent is derived from it
        let ratio = rx.max(ry);
        let next = (body.magnification * ratio).max(1.0);
        let ratio = next / body.magnification;
        body.magnification = next;
        shape.width *= ratio;
        shape.height *= ratio;
    } else {
        let mut transform = shape.transform;
        transform.scale_x *= rx;
        transform.scale_y *= ry;
        shape.set_transform(transform)?;
    }
    keep_anchor(shape, anchor_scene, handle)
}

/// Translate so the handle opposite `handle` lands on `anchor_scene` again
fn keep_anchor(shape: &mut Shape, anchor_scene: Point, handle: ResizeHandle) -> EditorResult<()> {
    let bounds = shape.local_bounds();
    let (ox, oy) = handle.opposite().direction();
    let center = bounds.center();
    let anchor = Point::new(
        center.x + ox * bounds.width() * 0.5,
        center.y + oy * bounds.height() * 0.5,
    );
    let drift = anchor_scene - shape.matrix().apply(anchor);
    let transform = ShapeTransform {
        translation: shape.transform.translation + drift,
        ..shape.transform
    };
    shape.set_transform(transform)
}

/// Rotate about the shape center by the angle the pointer swept around it
fn rotate(shape: &mut Shape, origin: Point, scene: Point, modifiers: DragModifiers) -> EditorResult<()> {
    let center = shape.center();
    let (from, to) = (origin - center, scene - center);
    if from.length() <= f32::EPSILON || to.length() <= f32::EPSILON {
        return Ok(());
    }
    let swept = (to.y.atan2(to.x) - from.y.atan2(from.x)).to_degrees();
    let mut angle = shape.transform.rotation + swept;
    if modifiers.shift {
        angle = (angle / ROTATION_SNAP).round() * ROTATION_SNAP;
    }
    let angle = angle.rem_euclid(360.0);
    let transform = ShapeTransform {
        rotation: angle,
        translation: center,
        ..shape.transform
    };
    shape.set_transform(transform)
}
