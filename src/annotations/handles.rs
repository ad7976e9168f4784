//! Control handles
//!
//! Every shape kind owns a fixed set of named handles. A handle's position is
//! a local semantic point pushed through the shape transform and the viewport;
//! a few handles (rotate, delete, confirm) sit at a fixed screen distance
//! outside the shape so they stay reachable at any zoom.

use crate::domain::{ArrowEnd, Point, Shape, ShapeBody, Viewport};

/// Screen distance between the top edge and the rotate handle
pub const ROTATE_OFFSET: f32 = 24.0;
/// Screen offset of the delete and confirm buttons from their corner
pub const BUTTON_OFFSET: f32 = 16.0;

/// Resize handle positions, clockwise from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    /// North-West corner
    NW,
    /// North edge
    N,
    /// North-East corner
    NE,
    /// East edge
    E,
    /// South-East corner
    SE,
    /// South edge
    S,
    /// South-West corner
    SW,
    /// West edge
    W,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::N,
        ResizeHandle::NE,
        ResizeHandle::E,
        ResizeHandle::SE,
        ResizeHandle::S,
        ResizeHandle::SW,
        ResizeHandle::W,
    ];

    pub const CORNERS: [ResizeHandle; 4] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SE,
        ResizeHandle::SW,
    ];

    /// Unit direction of the handle from the shape center, in local axes
    pub fn direction(self) -> (f32, f32) {
        match self {
            ResizeHandle::NW => (-1.0, -1.0),
            ResizeHandle::N => (0.0, -1.0),
            ResizeHandle::NE => (1.0, -1.0),
            ResizeHandle::E => (1.0, 0.0),
            ResizeHandle::SE => (1.0, 1.0),
            ResizeHandle::S => (0.0, 1.0),
            ResizeHandle::SW => (-1.0, 1.0),
            ResizeHandle::W => (-1.0, 0.0),
        }
    }

    pub fn is_corner(self) -> bool {
        let (dx, dy) = self.direction();
        dx != 0.0 && dy != 0.0
    }

    /// Handle on the other side of the center
    pub fn opposite(self) -> ResizeHandle {
        match self {
            ResizeHandle::NW => ResizeHandle::SE,
            ResizeHandle::N => ResizeHandle::S,
            ResizeHandle::NE => ResizeHandle::SW,
            ResizeHandle::E => ResizeHandle::W,
            ResizeHandle::SE => ResizeHandle::NW,
            ResizeHandle::S => ResizeHandle::N,
            ResizeHandle::SW => ResizeHandle::NE,
            ResizeHandle::W => ResizeHandle::E,
        }
    }
}

/// A named control on a selected shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Arrow endpoint
    Endpoint(ArrowEnd),
    /// Arrow bend control
    Bend,
    Resize(ResizeHandle),
    Rotate,
    Delete,
    /// Apply a crop
    Confirm,
}

impl Handle {
    /// Buttons act on press; everything else starts a drag
    pub fn is_button(self) -> bool {
        matches!(self, Handle::Delete | Handle::Confirm)
    }
}

/// Handles a shape shows while selected, in drawing order
pub fn handles_for(shape: &Shape) -> Vec<Handle> {
    let resize_all = ResizeHandle::ALL.map(Handle::Resize);
    let corners = ResizeHandle::CORNERS.map(Handle::Resize);
    let mut handles = Vec::with_capacity(11);
    match &shape.body {
        ShapeBody::Arrow(_) => {
            handles.extend([
                Handle::Endpoint(ArrowEnd::Start),
                Handle::Endpoint(ArrowEnd::End),
                Handle::Bend,
            ]);
        }
        // View size follows its source, so only corners (magnification) remain
        ShapeBody::MagnifierView(_) => handles.extend(corners),
        // Badges scale uniformly and never rotate
        ShapeBody::NumberMarker(_) => handles.extend(corners),
        ShapeBody::Crop => {
            handles.extend(resize_all);
            handles.push(Handle::Confirm);
        }
        ShapeBody::Mosaic(_) | ShapeBody::MagnifierSource(_) | ShapeBody::Background(_) => {
            handles.extend(resize_all);
            handles.push(Handle::Rotate);
        }
        ShapeBody::Connector(_) => return handles,
    }
    handles.push(Handle::Delete);
    handles
}

/// Local point a handle is anchored to
pub fn local_anchor(shape: &Shape, handle: Handle) -> Point {
    let bounds = shape.local_bounds();
    let (hw, hh) = (bounds.width() * 0.5, bounds.height() * 0.5);
    let center = bounds.center();
    match (handle, &shape.body) {
        (Handle::Endpoint(end), ShapeBody::Arrow(body)) => body.endpoint(end),
        (Handle::Bend, ShapeBody::Arrow(body)) => body.bend_handle(),
        (Handle::Resize(r), _) => {
            let (dx, dy) = r.direction();
            Point::new(center.x + dx * hw, center.y + dy * hh)
        }
        (Handle::Rotate, _) => Point::new(center.x, center.y - hh),
        (Handle::Delete, ShapeBody::Arrow(body)) => body.p2,
        (Handle::Delete, _) => Point::new(center.x + hw, center.y - hh),
        (Handle::Confirm, _) => Point::new(center.x + hw, center.y + hh),
        _ => center,
    }
}

/// Screen position of a handle under `viewport`
pub fn screen_position(shape: &Shape, handle: Handle, viewport: &Viewport) -> Point {
    let m = viewport.matrix().multiply(&shape.matrix());
    let anchor = m.apply(local_anchor(shape, handle));
    match handle {
        Handle::Rotate => {
            // Push outward along the shape's local "up" as seen on screen
            let up = m.apply_vector(Point::new(0.0, -1.0));
            let dir = up.normalized().unwrap_or(Point::new(0.0, -1.0));
            anchor + dir.scale(ROTATE_OFFSET)
        }
        Handle::Delete => anchor + Point::new(BUTTON_OFFSET, -BUTTON_OFFSET),
        Handle::Confirm => anchor + Point::new(BUTTON_OFFSET, BUTTON_OFFSET),
        _ => anchor,
    }
}

/// Handle under a screen point, buttons first, then the closest one within
/// `radius`.
pub fn handle_at(shape: &Shape, viewport: &Viewport, screen: Point, radius: f32) -> Option<Handle> {
    let handles = handles_for(shape);
    let within = |h: &Handle| screen_position(shape, *h, viewport).distance(screen) <= radius;
    if let Some(button) = handles.iter().find(|h| h.is_button() && within(h)) {
        return Some(*button);
    }
    handles
        .into_iter()
        .filter(|h| !h.is_button())
        .map(|h| (h, screen_position(shape, h, viewport).distance(screen)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(h, _)| h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::domain::{MagnifierShape, Rect};

    #[test]
    fn test_handle_sets_per_kind() {
        let config = EditorConfig::default();
        let arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config).unwrap();
        assert_eq!(
            handles_for(&arrow),
            vec![
                Handle::Endpoint(ArrowEnd::Start),
                Handle::Endpoint(ArrowEnd::End),
                Handle::Bend,
                Handle::Delete
            ]
        );

        let (view, source) = Shape::magnifier_pair(
            "v",
            "s",
            Rect::from_xywh(0.0, 0.0, 10.0, 10.0),
            Point::new(50.0, 50.0),
            2.0,
            MagnifierShape::Rect,
        )
        .unwrap();
        let view_handles = handles_for(&view);
        assert_eq!(view_handles.len(), 5);
        assert!(!view_handles.contains(&Handle::Rotate));
        assert!(!view_handles.contains(&Handle::Resize(ResizeHandle::N)));
        assert!(handles_for(&source).contains(&Handle::Rotate));

        let marker = Shape::number_marker("n", Point::ZERO, 1, &config);
        assert!(!handles_for(&marker).contains(&Handle::Rotate));

        let crop = Shape::crop("c", Rect::from_xywh(0.0, 0.0, 10.0, 10.0)).unwrap();
        let crop_handles = handles_for(&crop);
        assert!(crop_handles.contains(&Handle::Confirm));
        assert!(crop_handles.contains(&Handle::Delete));
        assert!(!crop_handles.contains(&Handle::Rotate));
    }

    #[test]
    fn test_positions_follow_viewport() {
        let config = EditorConfig::default();
        let arrow = Shape::arrow("a", Point::new(10.0, 10.0), Point::new(50.0, 10.0), &config).unwrap();
        let viewport = Viewport {
            pan: Point::new(5.0, 0.0),
            zoom: 2.0,
        };
        let p2 = screen_position(&arrow, Handle::Endpoint(ArrowEnd::End), &viewport);
        assert!(p2.distance(Point::new(105.0, 20.0)) < 1e-3);
        let bend = screen_position(&arrow, Handle::Bend, &viewport);
        assert!(bend.distance(Point::new(65.0, 20.0)) < 1e-3);
    }

    #[test]
    fn test_rotate_handle_sits_above_top_edge() {
        let mosaic = Shape::mosaic("m", Rect::from_xywh(0.0, 0.0, 40.0, 20.0), 5.0).unwrap();
        let pos = screen_position(&mosaic, Handle::Rotate, &Viewport::default());
        assert!(pos.distance(Point::new(20.0, -ROTATE_OFFSET)) < 1e-3);
    }

    #[test]
    fn test_handle_at_prefers_buttons_then_nearest() {
        let mosaic = Shape::mosaic("m", Rect::from_xywh(0.0, 0.0, 40.0, 20.0), 5.0).unwrap();
        let viewport = Viewport::default();
        assert_eq!(
            handle_at(&mosaic, &viewport, Point::new(41.0, 19.0), 6.0),
            Some(Handle::Resize(ResizeHandle::SE))
        );
        let delete = screen_position(&mosaic, Handle::Delete, &viewport);
        assert_eq!(handle_at(&mosaic, &viewport, delete, 6.0), Some(Handle::Delete));
        assert_eq!(handle_at(&mosaic, &viewport, Point::new(20.0, 10.0), 6.0), None);
    }
}
