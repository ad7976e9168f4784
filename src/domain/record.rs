//! Scene JSON: one record per shape, common fields merged with body fields
//!
//! Fields a record carries that this build does not understand are kept in
//! [`Shape::extra`] and written back unchanged.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::arrow::ArrowBody;
use super::shape::{
    BackgroundBody, ConnectorBody, MagnifierSourceBody, MagnifierViewBody, MosaicBody,
    NumberMarkerBody, Shape, ShapeBody, ShapeKind, ShapeTransform,
};
use crate::config::ShapeColor;
use crate::error::{EditorError, EditorResult};

fn yes() -> bool {
    true
}

/// Fields every record carries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommonFields {
    #[serde(default)]
    id: String,
    kind: String,
    #[serde(default)]
    transform: ShapeTransform,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    stroke_color: ShapeColor,
    #[serde(default)]
    stroke_width: f32,
    #[serde(default)]
    stroke_uniform: bool,
    #[serde(default = "yes")]
    visible: bool,
    #[serde(default = "yes")]
    selectable: bool,
}

const COMMON_KEYS: [&str; 10] = [
    "id",
    "kind",
    "transform",
    "width",
    "height",
    "strokeColor",
    "strokeWidth",
    "strokeUniform",
    "visible",
    "selectable",
];

/// Derived marker field written for older readers, recomputed on load
const MARKER_RADIUS_KEY: &str = "radius";

fn to_object(value: Value) -> EditorResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EditorError::serde(format!("expected an object, got {other}"))),
    }
}

fn body_to_object<T: Serialize>(body: &T) -> EditorResult<Map<String, Value>> {
    to_object(serde_json::to_value(body)?)
}

fn body_from_object<T: for<'de> Deserialize<'de>>(map: &Map<String, Value>) -> EditorResult<T> {
    Ok(serde_json::from_value(Value::Object(map.clone()))?)
}

impl ShapeBody {
    fn to_object(&self) -> EditorResult<Map<String, Value>> {
        match self {
            ShapeBody::Arrow(body) => body_to_object(body),
            ShapeBody::Mosaic(body) => body_to_object(body),
            ShapeBody::MagnifierView(body) => body_to_object(body),
            ShapeBody::MagnifierSource(body) => body_to_object(body),
            ShapeBody::NumberMarker(body) => {
                let mut map = body_to_object(body)?;
                map.insert(MARKER_RADIUS_KEY.into(), serde_json::to_value(body.radius())?);
                Ok(map)
            }
            ShapeBody::Crop => Ok(Map::new()),
            ShapeBody::Background(body) => body_to_object(body),
            ShapeBody::Connector(body) => body_to_object(body),
        }
    }

    fn from_object(kind: ShapeKind, map: &Map<String, Value>) -> EditorResult<Self> {
        let body = match kind {
            ShapeKind::Arrow => ShapeBody::Arrow(body_from_object::<ArrowBody>(map)?),
            ShapeKind::Mosaic => ShapeBody::Mosaic(body_from_object::<MosaicBody>(map)?),
            ShapeKind::MagnifierView => {
                ShapeBody::MagnifierView(body_from_object::<MagnifierViewBody>(map)?)
            }
            ShapeKind::MagnifierSource => {
                ShapeBody::MagnifierSource(body_from_object::<MagnifierSourceBody>(map)?)
            }
            ShapeKind::NumberMarker => {
                let mut map = map.clone();
                // Sessions that only stored the badge radius
                if !map.contains_key("fontSize")
                    && let Some(radius) = map.get(MARKER_RADIUS_KEY).and_then(Value::as_f64)
                {
                    let font_size = radius / f64::from(NumberMarkerBody::RADIUS_FACTOR);
                    map.insert("fontSize".into(), Value::from(font_size));
                }
                ShapeBody::NumberMarker(body_from_object::<NumberMarkerBody>(&map)?)
            }
            ShapeKind::Crop => ShapeBody::Crop,
            ShapeKind::Background => ShapeBody::Background(body_from_object::<BackgroundBody>(map)?),
            ShapeKind::Connector => ShapeBody::Connector(body_from_object::<ConnectorBody>(map)?),
        };
        Ok(body)
    }
}

impl Shape {
    /// Serialize into a scene record
    pub fn to_record(&self) -> EditorResult<Value> {
        let common = CommonFields {
            id: self.id.clone(),
            kind: self.kind().as_str().to_string(),
            transform: self.transform,
            width: self.width,
            height: self.height,
            stroke_color: self.stroke_color,
            stroke_width: self.stroke_width,
            stroke_uniform: self.stroke_uniform,
            visible: self.visible,
            selectable: self.selectable,
        };
        let mut record = self.extra.clone();
        record.extend(self.body.to_object()?);
        record.extend(to_object(serde_json::to_value(&common)?)?);
        Ok(Value::Object(record))
    }

    /// Rebuild a shape from a scene record.
    ///
    /// Fails with [`EditorError::UnknownShapeKind`] for kinds this build does
    /// not know and with [`EditorError::InvalidGeometry`] for unusable values.
    pub fn from_record(record: &Value) -> EditorResult<Shape> {
        let map = match record {
            Value::Object(map) => map,
            other => return Err(EditorError::serde(format!("shape record is not an object: {other}"))),
        };
        let common: CommonFields = body_from_object(map)?;
        let kind = ShapeKind::parse(&common.kind)
            .ok_or_else(|| EditorError::UnknownShapeKind(common.kind.clone()))?;
        let body = ShapeBody::from_object(kind, map)?;

        let mut known: HashSet<String> = COMMON_KEYS.iter().map(|key| key.to_string()).collect();
        known.extend(body.to_object()?.into_iter().map(|(key, _)| key));
        let extra = map
            .iter()
            .filter(|(key, _)| !known.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut shape = Shape::new(common.id, body, common.transform.translation, common.width, common.height);
        shape.transform = common.transform;
        shape.stroke_color = common.stroke_color;
        shape.stroke_width = common.stroke_width;
        shape.stroke_uniform = common.stroke_uniform;
        shape.visible = common.visible;
        shape.selectable = common.selectable;
        shape.extra = extra;
        shape.refresh_extent();
        shape.validate()?;
        Ok(shape)
    }
}

/// Serialize an ordered shape list to scene JSON
pub fn serialize_scene(shapes: &[Shape]) -> EditorResult<String> {
    let records = shapes
        .iter()
        .map(Shape::to_record)
        .collect::<EditorResult<Vec<_>>>()?;
    Ok(serde_json::to_string(&Value::Array(records))?)
}

/// Parse scene JSON into a shape list.
///
/// Accepts a bare array or an object with an `objects` array. Entries that
/// fail to load are logged and dropped; the rest of the scene still loads.
pub fn deserialize_scene(json: &str) -> EditorResult<Vec<Shape>> {
    let value: Value = serde_json::from_str(json)?;
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("objects") {
            Some(Value::Array(records)) => records,
            _ => return Err(EditorError::serde("scene object has no `objects` array")),
        },
        _ => return Err(EditorError::serde("scene must be an array of shape records")),
    };

    let mut shapes = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match Shape::from_record(record) {
            Ok(shape) => shapes.push(shape),
            Err(err) => log::warn!("Dropping scene entry {index}: {err}"),
        }
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::domain::arrow::{AnchorStyle, HeadKind, HeadStyle, LineStyle};
    use crate::domain::geometry::{Point, Rect};
    use crate::domain::shape::MagnifierShape;

    fn sample_scene() -> Vec<Shape> {
        let config = EditorConfig::default();
        let mut arrow = Shape::arrow("a1", Point::new(10.0, 10.0), Point::new(90.0, 40.0), &config).unwrap();
        if let Some(body) = arrow.as_arrow_mut() {
            body.bend = Point::new(5.0, -12.5);
            body.anchor_style = AnchorStyle::Curved;
            body.head_kind = HeadKind::Both;
            body.head_style = HeadStyle::SwallowtailHollow;
            body.line_style = LineStyle::DashDot;
        }
        arrow.refresh_extent();
        arrow.transform.rotation = 12.5;
        arrow.transform.scale_x = 1.5;

        let mosaic = Shape::mosaic("m1", Rect::from_xywh(0.0, 0.0, 60.0, 30.0), 6.0).unwrap();
        let (view, source) = Shape::magnifier_pair(
            "v1",
            "s1",
            Rect::from_xywh(20.0, 20.0, 40.0, 30.0),
            Point::new(150.0, 150.0),
            3.0,
            MagnifierShape::Ellipse,
        )
        .unwrap();
        let connector = Shape::connector("c1", "v1", "s1", Point::new(40.0, 35.0), Point::new(150.0, 150.0));
        let marker = Shape::number_marker("n1", Point::new(5.0, 5.0), 7, &config);
        let crop = Shape::crop("k1", Rect::from_xywh(1.0, 2.0, 30.0, 40.0)).unwrap();
        let background =
            Shape::background("b1", Rect::from_xywh(0.0, 0.0, 200.0, 100.0), ShapeColor::WHITE).unwrap();
        vec![background, arrow, mosaic, source, view, connector, marker, crop]
    }

    #[test]
    fn test_scene_round_trip_every_kind() {
        let shapes = sample_scene();
        let json = serialize_scene(&shapes).unwrap();
        let restored = deserialize_scene(&json).unwrap();
        assert_eq!(restored, shapes);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"[{"id":"m","kind":"mosaic","transform":{"translation":{"x":5,"y":5}},
            "width":10,"height":10,"blockSize":4,"futureFlag":{"nested":[1,2]},"label":"secret"}]"#;
        let shapes = deserialize_scene(json).unwrap();
        assert_eq!(shapes[0].extra.len(), 2);
        let again = deserialize_scene(&serialize_scene(&shapes).unwrap()).unwrap();
        assert_eq!(again[0].extra.get("label"), Some(&Value::from("secret")));
        assert_eq!(again, shapes);
    }

    #[test]
    fn test_unknown_kind_drops_only_that_entry() {
        let json = r#"[
            {"id":"x","kind":"sparkle"},
            {"id":"k","kind":"crop","width":10,"height":5}
        ]"#;
        let shapes = deserialize_scene(json).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind(), ShapeKind::Crop);

        let err = Shape::from_record(&serde_json::json!({"kind": "sparkle"})).unwrap_err();
        assert_eq!(err, EditorError::UnknownShapeKind("sparkle".into()));
    }

    #[test]
    fn test_invalid_geometry_entry_is_dropped() {
        let json = r#"[
            {"id":"bad","kind":"crop","transform":{"translation":{"x":0,"y":0},"scaleX":0}},
            {"id":"arrow","kind":"arrow","p1":{"x":0,"y":0},"p2":{"x":0,"y":0}}
        ]"#;
        assert!(deserialize_scene(json).unwrap().is_empty());
    }

    #[test]
    fn test_legacy_aliases_and_wrapper_object() {
        let json = r#"{"objects":[
            {"id":"m","kind":"mosaic-rect","width":20,"height":20},
            {"id":"n","kind":"number-marker","radius":24,"count":2}
        ]}"#;
        let shapes = deserialize_scene(json).unwrap();
        assert_eq!(shapes[0].kind(), ShapeKind::Mosaic);
        match &shapes[1].body {
            ShapeBody::NumberMarker(body) => {
                assert!((body.font_size - 30.0).abs() < 1e-4);
                assert_eq!(body.count, 2);
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert!(shapes[1].extra.is_empty());
        assert!(deserialize_scene("42").is_err());
    }
}
