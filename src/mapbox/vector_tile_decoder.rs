// https://docs.mapbox.com/vector-tiles/specification/#encoding-geometry
//
// [Geometry Encoding]
// Geometry is a stream of command integers, each packing a command id in its low 3 bits and a
// repeat count in the rest, followed by `count` zig-zag encoded (dx, dy) parameter pairs. The
// cursor is relative to the previous point across the whole feature.

use super::common::types::{Attributes, TYPE_KEY, ZOOM_KEY};
use super::style_model::Style;
use super::utils::transformation::{zigzag_decode, Transformation};
use super::value::Value;
use super::vector_tile_id::VectorTileID;
use super::vector_tile_model::{VectorTileLayer, VectorTileModel};

use log::trace;
use serde::Serialize;

const MOVE_TO: u32 = 1;
const LINE_TO: u32 = 2;
const CLOSE_PATH: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryKind {
    Unknown,
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    pub fn from_raw(r#type: u32) -> GeometryKind {
        match r#type {
            1 => GeometryKind::Point,
            2 => GeometryKind::LineString,
            3 => GeometryKind::Polygon,
            _ => GeometryKind::Unknown,
        }
    }

    /// The name `["geometry-type"]` filters compare against.
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Unknown => "Unknown",
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedFeature {
    pub kind: GeometryKind,
    pub tags: Attributes,
    pub parts: Vec<Vec<LonLat>>,
}

impl DecodedFeature {
    /// The feature's tags plus the `$zoom` and `$type` pseudo-keys, ready for
    /// filter and property evaluation.
    pub fn attributes_at(&self, zoom: f64) -> Attributes {
        let mut attrs = self.tags.clone();
        attrs.insert(ZOOM_KEY.to_string(), Value::Float(zoom));
        attrs.insert(TYPE_KEY.to_string(), Value::from(self.kind.name()));
        attrs
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedLayer {
    pub name: String,
    pub extent: u32,
    pub features: Vec<DecodedFeature>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodedTile {
    pub layers: Vec<DecodedLayer>,
}

pub fn decode_tile(
    tile: &VectorTileModel,
    tile_id: &VectorTileID,
    style: Option<&Style>,
) -> DecodedTile {
    DecodedTile {
        layers: tile
            .layers
            .iter()
            .filter_map(|layer| decode_layer(layer, tile_id, style))
            .collect(),
    }
}

/// Decodes one layer, or returns `None` when a style is given and none of its
/// layers draws `layer.name` at this zoom.
pub fn decode_layer(
    layer: &VectorTileLayer,
    tile_id: &VectorTileID,
    style: Option<&Style>,
) -> Option<DecodedLayer> {
    if let Some(style) = style {
        if !style.includes_source_layer(&layer.name, tile_id.z) {
            trace!("Skipping layer {} at {}", layer.name, tile_id);
            return None;
        }
    }

    let features = layer
        .features
        .iter()
        .map(|feature| DecodedFeature {
            kind: GeometryKind::from_raw(feature.r#type),
            tags: resolve_tags(layer, &feature.tags),
            parts: decode_geometry(&feature.geometry, layer.extent, tile_id),
        })
        .collect();

    Some(DecodedLayer {
        name: layer.name.clone(),
        extent: layer.extent,
        features,
    })
}

// Later pairs overwrite earlier ones for the same key.
fn resolve_tags(layer: &VectorTileLayer, tags: &[u32]) -> Attributes {
    let mut attrs = Attributes::new();
    for pair in tags.chunks_exact(2) {
        let key = layer.keys.get(pair[0] as usize);
        let value = layer
            .values
            .get(pair[1] as usize)
            .and_then(|v| v.to_value());
        if let (Some(key), Some(value)) = (key, value) {
            attrs.insert(key.clone(), value);
        }
    }
    attrs
}

pub fn decode_geometry(geometry: &[u32], extent: u32, tile_id: &VectorTileID) -> Vec<Vec<LonLat>> {
    let mut parts = vec![];
    let mut current: Vec<LonLat> = vec![];
    let (mut x, mut y) = (0i64, 0i64);

    let mut j = 0;
    'commands: while j < geometry.len() {
        let word = geometry[j];
        j += 1;
        let count = word >> 3;

        match word & 0x7 {
            MOVE_TO | LINE_TO => {
                if word & 0x7 == MOVE_TO && !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                for _ in 0..count {
                    if j + 1 >= geometry.len() {
                        trace!("Geometry ends inside a command at {}", j);
                        break 'commands;
                    }
                    x += zigzag_decode(geometry[j]) as i64;
                    y += zigzag_decode(geometry[j + 1]) as i64;
                    j += 2;

                    let (lon, lat) =
                        Transformation::tile_to_lonlat(x as f64, y as f64, extent, tile_id);
                    current.push(LonLat { lon, lat });
                }
            }
            CLOSE_PATH => {}
            op => trace!("Skipping unknown geometry command {}", op),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapbox::vector_tile_model::tests::{feature, int_value, layer, string_value, tile};
    use crate::mapbox::vector_tile_model::{VectorTileFeature, VectorTileValue};

    const EPS: f64 = 1e-9;

    fn tokyo() -> VectorTileID {
        VectorTileID::new(909, 403, 10)
    }

    fn local(point: &LonLat, extent: u32) -> (f64, f64) {
        // inverse of tile_to_lonlat for checking cursor positions
        let size = extent as f64 * 1024.0;
        let wx = (point.lon + 180.0) / 360.0;
        let lat = point.lat.to_radians();
        let wy = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0;
        (
            (wx * size - 909.0 * extent as f64).round(),
            (wy * size - 403.0 * extent as f64).round(),
        )
    }

    #[test]
    fn cursor_carries_across_commands() {
        // MoveTo(25, 17) LineTo(+2, +2) ClosePath MoveTo(+1, +1)
        let geometry = [9, 50, 34, 10, 4, 4, 15, 9, 2, 2];
        let parts = decode_geometry(&geometry, 4096, &tokyo());
        assert_eq!(parts.len(), 2);
        assert_eq!(local(&parts[0][0], 4096), (25.0, 17.0));
        assert_eq!(local(&parts[0][1], 4096), (27.0, 19.0));
        assert_eq!(local(&parts[1][0], 4096), (28.0, 20.0));
    }

    #[test]
    fn origin_projects_to_tile_corner() {
        let parts = decode_geometry(&[9, 0, 0], 4096, &tokyo());
        assert!((parts[0][0].lon - 139.5703125).abs() < EPS);
        assert!((parts[0][0].lat - 35.7465122599185).abs() < EPS);
    }

    #[test]
    fn multipoint_move_to_stays_in_one_part() {
        let parts = decode_geometry(&[17, 2, 2, 4, 4], 4096, &tokyo());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 2);
    }

    #[test]
    fn unknown_commands_are_skipped() {
        let parts = decode_geometry(&[3, 9, 2, 2, 6, 18, 2, 2], 4096, &tokyo());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 2);
    }

    #[test]
    fn truncated_geometry_keeps_decoded_points() {
        // LineTo claims three pairs but only one and a half remain
        let parts = decode_geometry(&[9, 2, 2, 26, 2, 2, 2], 4096, &tokyo());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].len(), 2);
        assert!(decode_geometry(&[15, 15], 4096, &tokyo()).is_empty());
    }

    #[test]
    fn tags_resolve_last_wins_and_skip_bad_indices() {
        let layer = VectorTileLayer {
            name: "road".to_string(),
            features: vec![],
            keys: vec!["a".to_string(), "b".to_string()],
            values: vec![
                VectorTileValue::Int64Val(1),
                VectorTileValue::StringVal("x".to_string()),
                VectorTileValue::None,
            ],
            extent: 4096,
        };
        let attrs = resolve_tags(&layer, &[0, 0, 0, 1, 1, 9, 5, 0, 1, 2, 1]);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["a"], Value::from("x"));
    }

    #[test]
    fn decodes_feature_with_kind_and_attributes() {
        let model = VectorTileModel::parse(&tile(&[layer(
            "road",
            4096,
            &["vt_code", "name"],
            &[int_value(5322), string_value("国道1号")],
            &[feature(2, &[0, 0, 1, 1], &[9, 50, 34, 10, 4, 4])],
        )]))
        .unwrap();
        let decoded = decode_tile(&model, &tokyo(), None);
        let feature = &decoded.layers[0].features[0];
        assert_eq!(feature.kind, GeometryKind::LineString);
        assert_eq!(feature.tags["vt_code"], Value::Int(5322));
        assert_eq!(feature.parts[0].len(), 3);

        let attrs = feature.attributes_at(15.0);
        assert_eq!(attrs[ZOOM_KEY], Value::Float(15.0));
        assert_eq!(attrs[TYPE_KEY], Value::from("LineString"));
        assert!(!feature.tags.contains_key(ZOOM_KEY));
    }

    #[test]
    fn empty_feature_has_no_parts() {
        let layer = VectorTileLayer {
            features: vec![VectorTileFeature::default()],
            ..VectorTileLayer::default()
        };
        let decoded = decode_layer(&layer, &tokyo(), None).unwrap();
        assert!(decoded.features[0].parts.is_empty());
        assert_eq!(decoded.features[0].kind, GeometryKind::Unknown);
    }
}
