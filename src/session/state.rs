use std::collections::HashMap;

use image::RgbaImage;
use tiny_skia::Pixmap;

use crate::annotations::{
    DragModifiers, DragSession, DragTarget, Handle, handle_at, press_bend,
};
use crate::config::{EditorConfig, ShapeColor};
use crate::domain::{
    HitTolerance, MagnifierShape, Point, Rect, Shape, ShapeBody, ShapeId, ShapeKind, Viewport,
    deserialize_scene, serialize_scene,
};
use crate::error::{EditorError, EditorResult};
use crate::persist::{embed_payload, extract_payload};
use crate::render::export::{encode_png, flatten};
use crate::render::image::BackgroundImage;
use crate::render::selection::draw_selection;
use crate::render::{RenderContext, SceneView, render_scene};

/// Magnifier views whose size drifts further than this are re-synced
const SIZE_SYNC_EPSILON: f32 = 0.1;

/// What happened to a shape, reported to change listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeChange {
    Added,
    Updated,
    Removed,
}

pub type ShapeListener = Box<dyn FnMut(&ShapeId, ShapeChange)>;

/// Result of a pointer press
#[derive(Debug, Clone, PartialEq)]
pub enum PressOutcome {
    /// A drag started on a handle of the selected shape
    Handle(Handle),
    /// A shape was hit, selected, and a move drag started
    Selected(ShapeId),
    /// The delete button removed these shapes
    Deleted(Vec<ShapeId>),
    /// The confirm button applied a crop to this scene region
    CropConfirmed(Rect),
    /// A double press on the bend handle straightened an arrow
    BendReset(ShapeId),
    Nothing,
}

/// One open editor: shapes in z-order, background, selection and the
/// in-flight drag
pub struct EditSession {
    config: EditorConfig,
    shapes: Vec<Shape>,
    background: Option<BackgroundImage>,
    canvas: Option<Rect>,
    pub viewport: Viewport,
    selection: Vec<ShapeId>,
    drag: Option<DragSession>,
    crop_region: Option<Rect>,
    listeners: Vec<ShapeListener>,
    next_id: u64,
}

impl EditSession {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config: config.sanitized(),
            shapes: Vec::new(),
            background: None,
            canvas: None,
            viewport: Viewport::default(),
            selection: Vec::new(),
            drag: None,
            crop_region: None,
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Session over a raster background
    pub fn with_background(config: EditorConfig, image: &RgbaImage) -> EditorResult<Self> {
        let background = BackgroundImage::from_rgba(image)
            .ok_or_else(|| EditorError::geometry("background image is empty"))?;
        let mut session = Self::new(config);
        session.background = Some(background);
        Ok(session)
    }

    /// Open an image file. Scene state embedded by a previous export is
    /// restored; any other image opens with an empty scene.
    pub fn open(config: EditorConfig, bytes: &[u8]) -> EditorResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| EditorError::container(err.to_string()))?
            .to_rgba8();
        let mut session = Self::with_background(config, &image)?;
        if let Some(json) = extract_payload(bytes, &session.config.payload_key) {
            let count = session.load_scene(&json)?;
            log::info!("Restored {count} shapes from embedded scene");
        }
        Ok(session)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    /// Host canvas extent, used when there is no background image
    pub fn set_canvas(&mut self, canvas: Option<Rect>) {
        self.canvas = canvas;
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    /// Region applied by the last confirmed crop
    pub fn crop_region(&self) -> Option<Rect> {
        self.crop_region
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Register a callback invoked whenever a shape is added, edited or
    /// removed
    pub fn on_shape_changed(&mut self, listener: impl FnMut(&ShapeId, ShapeChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, id: &ShapeId, change: ShapeChange) {
        for listener in &mut self.listeners {
            listener(id, change);
        }
    }

    pub fn scene_view(&self) -> SceneView<'_> {
        SceneView {
            shapes: &self.shapes,
            background: self.background.as_ref(),
            canvas: self.canvas,
        }
    }

    /// Unused id for a new shape of `kind`
    pub fn fresh_id(&mut self, kind: ShapeKind) -> ShapeId {
        loop {
            let id = format!("{}-{}", kind.as_str(), self.next_id);
            self.next_id += 1;
            if self.shape(&id).is_none() {
                return id;
            }
        }
    }

    /// Append a shape on top. Empty or duplicate ids are replaced.
    pub fn add(&mut self, mut shape: Shape) -> EditorResult<ShapeId> {
        shape.validate()?;
        if shape.id.is_empty() || self.shape(&shape.id).is_some() {
            shape.id = self.fresh_id(shape.kind());
        }
        let id = shape.id.clone();
        self.shapes.push(shape);
        self.notify(&id, ShapeChange::Added);
        Ok(id)
    }

    pub fn add_arrow(&mut self, from: Point, to: Point) -> EditorResult<ShapeId> {
        let id = self.fresh_id(ShapeKind::Arrow);
        let mut arrow = Shape::arrow(id, from, to, &self.config)?;
        arrow.stroke_color = self.config.stroke_color;
        self.add(arrow)
    }

    pub fn add_mosaic(&mut self, rect: Rect) -> EditorResult<ShapeId> {
        let id = self.fresh_id(ShapeKind::Mosaic);
        let mosaic = Shape::mosaic(id, rect, self.config.mosaic_block_size)?;
        self.add(mosaic)
    }

    /// Add a source over `source_rect`, its view at `view_center` and the
    /// connector between them. Returns `(view, source)` ids.
    pub fn add_magnifier(
        &mut self,
        source_rect: Rect,
        view_center: Point,
        magnifier_shape: MagnifierShape,
    ) -> EditorResult<(ShapeId, ShapeId)> {
        let view_id = self.fresh_id(ShapeKind::MagnifierView);
        let source_id = self.fresh_id(ShapeKind::MagnifierSource);
        let connector_id = self.fresh_id(ShapeKind::Connector);
        let (view, source) = Shape::magnifier_pair(
            view_id.clone(),
            source_id.clone(),
            source_rect,
            view_center,
            self.config.magnification,
            magnifier_shape,
        )?;
        let connector = Shape::connector(
            connector_id,
            view_id.clone(),
            source_id.clone(),
            source.center(),
            view.center(),
        );
        // Connector goes underneath both ends
        self.add(connector)?;
        self.add(source)?;
        self.add(view)?;
        Ok((view_id, source_id))
    }

    /// Numbered badge continuing from the highest existing count
    pub fn add_marker(&mut self, center: Point) -> EditorResult<ShapeId> {
        let count = self
            .shapes
            .iter()
            .filter_map(|s| match &s.body {
                ShapeBody::NumberMarker(body) => Some(body.count),
                _ => None,
            })
            .max()
            .unwrap_or(0)
            + 1;
        let id = self.fresh_id(ShapeKind::NumberMarker);
        let marker = Shape::number_marker(id, center, count, &self.config);
        self.add(marker)
    }

    /// Start a crop; any pending crop rectangle is replaced
    pub fn add_crop(&mut self, rect: Rect) -> EditorResult<ShapeId> {
        let id = self.fresh_id(ShapeKind::Crop);
        let crop = Shape::crop(id, rect)?;
        let pending: Vec<ShapeId> = self
            .shapes
            .iter()
            .filter(|s| s.kind() == ShapeKind::Crop)
            .map(|s| s.id.clone())
            .collect();
        for old in pending {
            self.remove(&old);
        }
        self.add(crop)
    }

    /// Backdrop rectangle for sessions without a raster background
    pub fn add_background(&mut self, rect: Rect, fill: ShapeColor) -> EditorResult<ShapeId> {
        let id = self.fresh_id(ShapeKind::Background);
        let background = Shape::background(id, rect, fill)?;
        let id = background.id.clone();
        self.shapes.insert(0, background);
        self.notify(&id, ShapeChange::Added);
        Ok(id)
    }

    /// Remove a shape. Magnifier views and sources take their partner and
    /// every connector that references either of them along.
    pub fn remove(&mut self, id: &str) -> Vec<ShapeId> {
        let Some(shape) = self.shape(id) else {
            return Vec::new();
        };
        let mut doomed: Vec<ShapeId> = vec![shape.id.clone()];
        if matches!(shape.kind(), ShapeKind::MagnifierView | ShapeKind::MagnifierSource) {
            doomed.extend(shape.linked_ids().into_iter().cloned());
            let pair = doomed.clone();
            doomed.extend(
                self.shapes
                    .iter()
                    .filter(|s| s.kind() == ShapeKind::Connector)
                    .filter(|s| s.linked_ids().iter().any(|link| pair.contains(link)))
                    .map(|s| s.id.clone()),
            );
        }
        let mut removed = Vec::new();
        self.shapes.retain(|s| {
            let gone = doomed.contains(&s.id);
            if gone {
                removed.push(s.id.clone());
            }
            !gone
        });
        self.selection.retain(|s| !removed.contains(s));
        if self
            .drag
            .as_ref()
            .is_some_and(|drag| removed.contains(&drag.shape_id))
        {
            self.drag = None;
        }
        for gone in &removed {
            self.notify(gone, ShapeChange::Removed);
        }
        removed
    }

    /// Edit a shape in place (property panels). A rejected edit leaves the
    /// shape as it was. Returns false when there is no such shape.
    pub fn update_shape(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut Shape) -> EditorResult<()>,
    ) -> EditorResult<bool> {
        let Some(index) = self.shapes.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let mut next = self.shapes[index].clone();
        edit(&mut next)?;
        next.refresh_extent();
        next.validate()?;
        let changed = next != self.shapes[index];
        self.shapes[index] = next;
        if changed {
            self.sync_linked();
            self.notify(&id.to_string(), ShapeChange::Updated);
        }
        Ok(true)
    }

    /// Topmost visible, selectable shape under a scene point
    pub fn hit_test(&self, scene: Point) -> Option<ShapeId> {
        let tolerance = HitTolerance::from(&self.config);
        self.shapes
            .iter()
            .rev()
            .filter(|s| s.visible && s.selectable)
            .find(|s| s.contains_point_with(scene, &tolerance))
            .map(|s| s.id.clone())
    }

    pub fn select(&mut self, id: &str) {
        if self.shape(id).is_some_and(|s| s.selectable) {
            self.selection = vec![id.to_string()];
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Pointer press at a screen position. Handles of the selected shape win
    /// over shapes underneath them.
    pub fn press(&mut self, screen: Point, time_ms: u64, _modifiers: DragModifiers) -> PressOutcome {
        self.cancel_drag();
        let scene = self.viewport.to_scene(screen);

        let hit_handle = self.selection.last().and_then(|id| {
            let shape = self.shape(id)?;
            let handle = handle_at(shape, &self.viewport, screen, self.config.handle_radius)?;
            Some((id.clone(), handle))
        });
        if let Some((id, handle)) = hit_handle {
            match handle {
                Handle::Delete => return PressOutcome::Deleted(self.remove(&id)),
                Handle::Confirm => {
                    return match self.confirm_crop(&id) {
                        Ok(region) => PressOutcome::CropConfirmed(region),
                        Err(err) => {
                            log::warn!("Crop {id} not applied: {err}");
                            PressOutcome::Nothing
                        }
                    };
                }
                Handle::Bend => {
                    let window = self.config.double_click_ms;
                    let reset = self
                        .shapes
                        .iter_mut()
                        .find(|s| s.id == id)
                        .is_some_and(|s| press_bend(s, time_ms, window));
                    if reset {
                        self.notify(&id, ShapeChange::Updated);
                        return PressOutcome::BendReset(id);
                    }
                }
                _ => {}
            }
            self.drag = self
                .shape(&id)
                .map(|shape| DragSession::begin(shape, DragTarget::Handle(handle), scene));
            return PressOutcome::Handle(handle);
        }

        match self.hit_test(scene) {
            Some(id) => {
                self.select(&id);
                self.drag = self
                    .shape(&id)
                    .map(|shape| DragSession::begin(shape, DragTarget::Body, scene));
                PressOutcome::Selected(id)
            }
            None => {
                self.clear_selection();
                PressOutcome::Nothing
            }
        }
    }

    /// Pointer motion during a drag. Returns whether the shape changed;
    /// invalid intermediate geometry is rejected and logged.
    pub fn drag_to(&mut self, screen: Point, modifiers: DragModifiers) -> bool {
        let Some(drag) = &self.drag else {
            return false;
        };
        let scene = self.viewport.to_scene(screen);
        let Some(shape) = self.shapes.iter_mut().find(|s| s.id == drag.shape_id) else {
            self.drag = None;
            return false;
        };
        match drag.update(shape, scene, modifiers) {
            Ok(()) => {
                let id = shape.id.clone();
                self.sync_linked();
                self.notify(&id, ShapeChange::Updated);
                true
            }
            Err(err) => {
                log::debug!("Rejected drag of {}: {err}", drag.shape_id);
                false
            }
        }
    }

    /// Pointer release: keep the dragged state
    pub fn release(&mut self) -> Option<ShapeId> {
        let drag = self.drag.take()?;
        let changed = self
            .shape(&drag.shape_id)
            .is_some_and(|shape| *shape != drag.snapshot);
        changed.then_some(drag.shape_id)
    }

    /// Abandon the drag and restore the shape as it was when it began
    pub fn cancel_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        let id = drag.shape_id.clone();
        if let Some(shape) = self.shapes.iter_mut().find(|s| s.id == id) {
            drag.cancel(shape);
            self.sync_linked();
            self.notify(&id, ShapeChange::Updated);
        }
    }

    /// Re-derive linked geometry: view size from source size and
    /// magnification, connector endpoints from the pair's centers. Returns
    /// the ids that changed.
    pub fn sync_linked(&mut self) -> Vec<ShapeId> {
        let anchors: HashMap<ShapeId, (Point, (f32, f32))> = self
            .shapes
            .iter()
            .filter(|s| matches!(s.kind(), ShapeKind::MagnifierView | ShapeKind::MagnifierSource))
            .map(|s| (s.id.clone(), (s.center(), s.scaled_size())))
            .collect();

        let mut changed = Vec::new();
        for shape in &mut self.shapes {
            let dirty = match &shape.body {
                ShapeBody::MagnifierView(body) => {
                    let Some((_, (sw, sh))) = body.source_id.as_ref().and_then(|id| anchors.get(id)) else {
                        continue;
                    };
                    let (tw, th) = (sw * body.magnification, sh * body.magnification);
                    let (vw, vh) = shape.scaled_size();
                    if (vw - tw).abs() > SIZE_SYNC_EPSILON || (vh - th).abs() > SIZE_SYNC_EPSILON {
                        shape.width = tw;
                        shape.height = th;
                        shape.transform.scale_x = 1.0;
                        shape.transform.scale_y = 1.0;
                        true
                    } else {
                        false
                    }
                }
                ShapeBody::Connector(body) => {
                    let ends = body
                        .source_id
                        .as_ref()
                        .and_then(|id| anchors.get(id))
                        .zip(body.view_id.as_ref().and_then(|id| anchors.get(id)));
                    let Some(((from, _), (to, _))) = ends else {
                        continue;
                    };
                    let (from, to) = (*from, *to);
                    match shape.connector_endpoints() {
                        Some((a, b)) if a.distance(from) <= f32::EPSILON && b.distance(to) <= f32::EPSILON => false,
                        _ => {
                            shape.set_connector_ends(from, to);
                            true
                        }
                    }
                }
                _ => false,
            };
            if dirty {
                changed.push(shape.id.clone());
            }
        }
        for id in &changed {
            self.notify(id, ShapeChange::Updated);
        }
        changed
    }

    /// Draw the scene and selection chrome through the viewport
    pub fn render(&mut self, pixmap: &mut Pixmap) {
        self.sync_linked();
        let scene = self.scene_view();
        let mut ctx = RenderContext::new(pixmap, self.viewport.matrix());
        ctx.shroud_color = self.config.shroud_color;
        render_scene(&mut ctx, &scene);
        for id in &self.selection {
            if let Some(shape) = scene.find(id) {
                draw_selection(pixmap, shape, &self.viewport);
            }
        }
    }

    /// Scene JSON of the current shape list
    pub fn serialize(&self) -> EditorResult<String> {
        serialize_scene(&self.shapes)
    }

    /// Replace the shape list from scene JSON. Returns how many shapes
    /// loaded.
    pub fn load_scene(&mut self, json: &str) -> EditorResult<usize> {
        let shapes = deserialize_scene(json)?;
        for old in std::mem::take(&mut self.shapes) {
            self.notify(&old.id, ShapeChange::Removed);
        }
        self.selection.clear();
        self.drag = None;
        self.next_id = shapes
            .iter()
            .filter_map(|s| s.id.rsplit('-').next()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        for shape in &shapes {
            if let Some(link) = shape
                .linked_ids()
                .into_iter()
                .find(|link| !shapes.iter().any(|s| &s.id == *link))
            {
                let missing = EditorError::MissingLinkedShape {
                    shape: shape.id.clone(),
                    target: link.clone(),
                };
                log::debug!("{missing}");
            }
        }
        self.shapes = shapes;
        let ids: Vec<ShapeId> = self.shapes.iter().map(|s| s.id.clone()).collect();
        for id in &ids {
            self.notify(id, ShapeChange::Added);
        }
        self.sync_linked();
        Ok(ids.len())
    }

    /// Scene extent an export covers before cropping
    pub fn export_extent(&self) -> Option<Rect> {
        self.scene_view().reference_rect()
    }

    /// Apply a crop rectangle: its scene bounds (clipped to the export
    /// extent) become the export region and the rectangle is removed.
    pub fn confirm_crop(&mut self, id: &str) -> EditorResult<Rect> {
        let shape = self
            .shape(id)
            .filter(|s| s.kind() == ShapeKind::Crop)
            .ok_or_else(|| EditorError::geometry(format!("{id} is not a crop rectangle")))?;
        let bounds = shape.bounding_box();
        let region = match self.export_extent() {
            Some(extent) => bounds
                .intersect(extent)
                .ok_or_else(|| EditorError::geometry("crop lies outside the image"))?,
            None => bounds,
        };
        self.crop_region = Some(region);
        self.remove(id);
        log::info!(
            "Crop applied: {}x{} at ({}, {})",
            region.width(),
            region.height(),
            region.left,
            region.top
        );
        Ok(region)
    }

    /// Flattened image of the export region
    pub fn export_image(&mut self) -> EditorResult<RgbaImage> {
        self.sync_linked();
        let region = self.export_region()?;
        flatten(&self.scene_view(), region)
    }

    /// PNG of the export region with the scene embedded for re-editing.
    /// Shapes are stored relative to the exported image's top-left corner.
    pub fn export_png(&mut self) -> EditorResult<Vec<u8>> {
        let image = self.export_image()?;
        let region = self.export_region()?;
        let offset = Point::new(-region.left, -region.top);
        let shifted: Vec<Shape> = self
            .shapes
            .iter()
            .map(|s| {
                let mut s = s.clone();
                s.transform.translation = s.transform.translation + offset;
                s
            })
            .collect();
        let json = serialize_scene(&shifted)?;
        let png = encode_png(&image)?;
        embed_payload(&png, &self.config.payload_key, &json)
    }

    fn export_region(&self) -> EditorResult<Rect> {
        self.crop_region
            .or_else(|| self.export_extent())
            .ok_or_else(|| EditorError::geometry("nothing to export: no background or canvas"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::ResizeHandle;
    use crate::domain::{ArrowEnd, ShapeTransform};
    use crate::render::image::sample_pixel;
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn canvas_session() -> EditSession {
        let image = RgbaImage::from_pixel(40, 30, Rgba([0, 0, 255, 255]));
        EditSession::with_background(EditorConfig::default(), &image).unwrap()
    }

    fn no_mods() -> DragModifiers {
        DragModifiers::default()
    }

    #[test]
    fn test_cascading_delete_of_magnifier() {
        let mut session = canvas_session();
        let arrow = session.add_arrow(Point::new(0.0, 0.0), Point::new(20.0, 0.0)).unwrap();
        let (view, source) = session
            .add_magnifier(Rect::from_xywh(0.0, 0.0, 10.0, 10.0), Point::new(30.0, 20.0), MagnifierShape::Rect)
            .unwrap();
        let marker = session.add_marker(Point::new(5.0, 5.0)).unwrap();
        assert_eq!(session.shapes().len(), 5);

        let mut removed = session.remove(&view);
        removed.sort();
        assert_eq!(removed.len(), 3);
        assert!(removed.contains(&view) && removed.contains(&source));
        assert!(session.shapes().iter().all(|s| s.kind() != ShapeKind::Connector));
        assert!(session.shape(&arrow).is_some() && session.shape(&marker).is_some());

        assert_eq!(session.remove(&arrow), vec![arrow.clone()]);
        assert_eq!(session.shapes().len(), 1);
        assert!(session.remove("missing").is_empty());
    }

    #[test]
    fn test_deleting_source_takes_the_view() {
        let mut session = canvas_session();
        let (view, source) = session
            .add_magnifier(Rect::from_xywh(0.0, 0.0, 10.0, 10.0), Point::new(30.0, 20.0), MagnifierShape::Ellipse)
            .unwrap();
        let removed = session.remove(&source);
        assert!(removed.contains(&view));
        assert!(session.shapes().is_empty());
    }

    #[test]
    fn test_listeners_see_changes() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut session = canvas_session();
        let sink = events.clone();
        session.on_shape_changed(move |id, change| sink.borrow_mut().push((id.clone(), change)));
        let id = session.add_arrow(Point::new(0.0, 0.0), Point::new(20.0, 0.0)).unwrap();
        session
            .update_shape(&id, |shape| {
                shape.stroke_width = 8.0;
                Ok(())
            })
            .unwrap();
        session.remove(&id);
        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                (id.clone(), ShapeChange::Added),
                (id.clone(), ShapeChange::Updated),
                (id, ShapeChange::Removed)
            ]
        );
    }

    #[test]
    fn test_rejected_edit_keeps_shape() {
        let mut session = canvas_session();
        let id = session.add_mosaic(Rect::from_xywh(0.0, 0.0, 20.0, 20.0)).unwrap();
        let before = session.shape(&id).cloned();
        let result = session.update_shape(&id, |shape| {
            shape.set_transform(ShapeTransform {
                scale_x: 0.0,
                ..shape.transform
            })
        });
        assert!(matches!(result, Err(EditorError::InvalidGeometry(_))));
        assert_eq!(session.shape(&id).cloned(), before);
        assert_eq!(session.update_shape("nope", |_| Ok(())), Ok(false));
    }

    #[test]
    fn test_hit_test_returns_topmost_selectable() {
        let mut session = canvas_session();
        session
            .add_background(Rect::from_xywh(0.0, 0.0, 40.0, 30.0), ShapeColor::WHITE)
            .unwrap();
        let lower = session.add_mosaic(Rect::from_xywh(0.0, 0.0, 20.0, 20.0)).unwrap();
        let upper = session.add_mosaic(Rect::from_xywh(10.0, 10.0, 20.0, 20.0)).unwrap();
        assert_eq!(session.hit_test(Point::new(15.0, 15.0)), Some(upper));
        assert_eq!(session.hit_test(Point::new(5.0, 5.0)), Some(lower));
        // Only the non-selectable backdrop is here
        assert_eq!(session.hit_test(Point::new(38.0, 2.0)), None);
    }

    #[test]
    fn test_view_follows_source_size_and_connector_follows_centers() {
        let mut session = canvas_session();
        let (view, source) = session
            .add_magnifier(Rect::from_xywh(0.0, 0.0, 50.0, 50.0), Point::new(200.0, 200.0), MagnifierShape::Rect)
            .unwrap();
        let size = session.shape(&view).unwrap().scaled_size();
        assert!((size.0 - 100.0).abs() <= 0.1 && (size.1 - 100.0).abs() <= 0.1);

        session
            .update_shape(&source, |shape| {
                shape.set_transform(ShapeTransform {
                    scale_x: 1.5,
                    translation: Point::new(40.0, 40.0),
                    ..shape.transform
                })
            })
            .unwrap();
        let view_shape = session.shape(&view).unwrap();
        assert!((view_shape.width - 150.0).abs() < 1e-3);
        assert!((view_shape.height - 100.0).abs() < 1e-3);

        let connector = session
            .shapes()
            .iter()
            .find(|s| s.kind() == ShapeKind::Connector)
            .unwrap();
        let (from, to) = connector.connector_endpoints().unwrap();
        assert!(from.distance(Point::new(40.0, 40.0)) < 1e-3);
        assert!(to.distance(Point::new(200.0, 200.0)) < 1e-3);
    }

    #[test]
    fn test_canvas_mode_exports_host_extent() {
        let mut session = EditSession::new(EditorConfig::default());
        assert!(session.export_image().is_err());
        session.set_canvas(Some(Rect::from_xywh(0.0, 0.0, 12.0, 8.0)));
        let image = session.export_image().unwrap();
        assert_eq!(image.dimensions(), (12, 8));
    }

    #[test]
    fn test_press_drag_release_and_cancel() {
        let mut session = canvas_session();
        let id = session.add_arrow(Point::new(10.0, 10.0), Point::new(90.0, 10.0)).unwrap();
        assert_eq!(session.press(Point::new(30.0, 11.0), 0, no_mods()), PressOutcome::Selected(id.clone()));
        assert!(session.is_dragging());
        assert!(session.drag_to(Point::new(30.0, 21.0), no_mods()));
        assert_eq!(session.release(), Some(id.clone()));
        assert!(!session.is_dragging());
        assert_eq!(session.shape(&id).unwrap().center(), Point::new(50.0, 20.0));

        // Endpoint handle of the selected arrow wins over the arrow body
        assert_eq!(
            session.press(Point::new(90.0, 20.0), 10, no_mods()),
            PressOutcome::Handle(Handle::Endpoint(ArrowEnd::End))
        );
        assert!(session.drag_to(Point::new(90.0, 60.0), no_mods()));
        session.cancel_drag();
        let (_, p2) = session.shape(&id).unwrap().arrow_endpoints().unwrap();
        assert!(p2.distance(Point::new(90.0, 20.0)) < 1e-3);

        // Empty space clears the selection
        assert_eq!(session.press(Point::new(200.0, 200.0), 20, no_mods()), PressOutcome::Nothing);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_double_press_on_bend_handle_straightens() {
        let mut session = canvas_session();
        let id = session.add_arrow(Point::new(10.0, 10.0), Point::new(90.0, 10.0)).unwrap();
        session.press(Point::new(30.0, 10.0), 0, no_mods());
        session.release();
        assert_eq!(session.press(Point::new(50.0, 10.0), 1_000, no_mods()), PressOutcome::Handle(Handle::Bend));
        assert!(session.drag_to(Point::new(50.0, 40.0), no_mods()));
        session.release();
        assert!(session.shape(&id).unwrap().as_arrow().unwrap().is_bent());

        assert_eq!(
            session.press(Point::new(50.0, 40.0), 1_100, no_mods()),
            PressOutcome::BendReset(id.clone())
        );
        assert!(!session.shape(&id).unwrap().as_arrow().unwrap().is_bent());
    }

    #[test]
    fn test_delete_button_and_resize_handle() {
        let mut session = canvas_session();
        let id = session.add_mosaic(Rect::from_xywh(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.select(&id);
        assert_eq!(
            session.press(Point::new(20.0, 20.0), 0, no_mods()),
            PressOutcome::Handle(Handle::Resize(ResizeHandle::SE))
        );
        session.cancel_drag();
        // Delete button: north-east corner pushed out by the button offset
        let outcome = session.press(Point::new(36.0, -16.0), 10, no_mods());
        assert_eq!(outcome, PressOutcome::Deleted(vec![id]));
        assert!(session.shapes().is_empty());
    }

    #[test]
    fn test_render_draws_scene_and_selection() {
        let mut session = canvas_session();
        let id = session.add_mosaic(Rect::from_xywh(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.select(&id);
        let mut pixmap = Pixmap::new(60, 60).unwrap();
        session.render(&mut pixmap);
        // Mosaic of a solid background keeps its color
        assert_eq!(sample_pixel(&pixmap, 10, 10), Some([0, 0, 255, 255]));
        // South-east knob
        assert_eq!(sample_pixel(&pixmap, 20, 20), Some([255, 255, 255, 255]));
        assert_eq!(sample_pixel(&pixmap, 50, 50), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_scene_round_trip_continues_ids() {
        let mut session = canvas_session();
        session.add_arrow(Point::new(0.0, 0.0), Point::new(20.0, 0.0)).unwrap();
        session.add_marker(Point::new(5.0, 5.0)).unwrap();
        let json = session.serialize().unwrap();

        let mut restored = canvas_session();
        assert_eq!(restored.load_scene(&json).unwrap(), 2);
        assert_eq!(restored.shapes(), session.shapes());
        let next = restored.add_marker(Point::new(9.0, 9.0)).unwrap();
        assert!(restored.shapes().iter().filter(|s| s.id == next).count() == 1);
        let ShapeBody::NumberMarker(body) = &restored.shape(&next).unwrap().body else {
            panic!("not a marker");
        };
        assert_eq!(body.count, 2);
    }

    #[test]
    fn test_export_reopens_with_scene() {
        let mut session = canvas_session();
        session.add_arrow(Point::new(5.0, 15.0), Point::new(35.0, 15.0)).unwrap();
        let png = session.export_png().unwrap();

        let reopened = EditSession::open(EditorConfig::default(), &png).unwrap();
        assert_eq!(reopened.background().map(|bg| (bg.width(), bg.height())), Some((40, 30)));
        assert_eq!(reopened.shapes().len(), 1);
        let (p1, p2) = reopened.shapes()[0].arrow_endpoints().unwrap();
        assert!(p1.distance(Point::new(5.0, 15.0)) < 1e-3);
        assert!(p2.distance(Point::new(35.0, 15.0)) < 1e-3);
    }

    #[test]
    fn test_confirmed_crop_limits_export() {
        let mut session = canvas_session();
        session.add_arrow(Point::new(5.0, 15.0), Point::new(35.0, 15.0)).unwrap();
        let crop = session.add_crop(Rect::from_xywh(10.0, 5.0, 20.0, 20.0)).unwrap();
        let region = session.confirm_crop(&crop).unwrap();
        assert_eq!(region, Rect::from_xywh(10.0, 5.0, 20.0, 20.0));
        assert!(session.shape(&crop).is_none());

        let image = session.export_image().unwrap();
        assert_eq!(image.dimensions(), (20, 20));
        // Arrow shaft crosses the cropped image at row 10
        assert_eq!(image.get_pixel(5, 10).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(5, 1).0, [0, 0, 255, 255]);

        let reopened = EditSession::open(EditorConfig::default(), &session.export_png().unwrap()).unwrap();
        let (p1, _) = reopened.shapes()[0].arrow_endpoints().unwrap();
        assert!(p1.distance(Point::new(-5.0, 10.0)) < 1e-3);
    }

    #[test]
    fn test_plain_image_opens_empty() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        let png = encode_png(&image).unwrap();
        let session = EditSession::open(EditorConfig::default(), &png).unwrap();
        assert!(session.shapes().is_empty());
        assert!(EditSession::open(EditorConfig::default(), b"junk").is_err());
    }
}
