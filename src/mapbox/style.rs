// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/root/
use super::common::map_error::MapError;
use super::expression::ExprTree;
use super::filter::FilterTree;
use super::style_model::{
    BackgroundLayer, FillLayer, LayerKind, LineLayer, Source, Style, StyleLayer, SymbolLayer,
};
use crate::config;

use log::debug;
use serde_json::{Map, Value};

pub fn load_str(text: &str) -> Result<Style, MapError> {
    let json: Value = serde_json::from_str(text)?;
    Ok(load(&json))
}

/// Builds a style from a parsed document. Layers of an unsupported type and
/// filters that cannot be parsed are dropped rather than failing the load.
pub fn load(json_value: &Value) -> Style {
    let layers = match json_value["layers"].as_array() {
        Some(layers) => layers,
        None => return Style::new(),
    };

    let layers = layers.iter().filter_map(parse_layer).collect();
    let sources = json_value["sources"]
        .as_object()
        .map(parse_sources)
        .unwrap_or_default();

    Style {
        name: String::from(json_value["name"].as_str().unwrap_or_default()),
        layers,
        sources,
    }
}

fn parse_sources(sources: &Map<String, Value>) -> Vec<Source> {
    sources
        .iter()
        .map(|(name, json_value)| Source {
            name: name.to_string(),
            kind: String::from(
                json_value["type"]
                    .as_str()
                    .unwrap_or(config::DEFAULT_SOURCE_TYPE),
            ),
            min_zoom: zoom_field(json_value, "minzoom", config::DEFAULT_MIN_ZOOM),
            max_zoom: zoom_field(json_value, "maxzoom", config::DEFAULT_MAX_ZOOM),
            tiles: json_value["tiles"][0].as_str().map(String::from),
            attribution: json_value["attribution"].as_str().map(String::from),
        })
        .collect()
}

fn parse_layer(json_value: &Value) -> Option<StyleLayer> {
    let id = json_value["id"].as_str().unwrap_or_default();
    let paint = &json_value["paint"];
    let layout = &json_value["layout"];

    let kind = match json_value["type"].as_str() {
        Some("fill") => LayerKind::Fill(FillLayer {
            fill_color: property(paint, "fill-color"),
            fill_opacity: property(paint, "fill-opacity"),
        }),
        Some("line") => LayerKind::Line(LineLayer {
            line_color: property(paint, "line-color"),
            line_width: property(paint, "line-width"),
            line_opacity: property(paint, "line-opacity"),
            dash_array: dash_array(&paint["line-dasharray"]),
        }),
        Some("symbol") => LayerKind::Symbol(SymbolLayer {
            text_field: text_field(&layout["text-field"]),
            text_size: property(layout, "text-size"),
            text_color: property(paint, "text-color"),
            text_opacity: property(paint, "text-opacity"),
            text_font: layout["text-font"]
                .as_array()
                .map(|fonts| fonts.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default(),
            text_anchor: String::from(layout["text-anchor"].as_str().unwrap_or("center")),
            icon_image: property(layout, "icon-image"),
            icon_size: property(layout, "icon-size"),
            icon_color: property(paint, "icon-color"),
            icon_opacity: property(paint, "icon-opacity"),
            icon_rotate: property(layout, "icon-rotate"),
        }),
        Some("background") => LayerKind::Background(BackgroundLayer {
            background_color: property(paint, "background-color"),
            background_opacity: property(paint, "background-opacity"),
        }),
        other => {
            debug!("Dropping layer {} with unsupported type {:?}", id, other);
            return None;
        }
    };

    let filter = match &json_value["filter"] {
        Value::Null => None,
        filter => FilterTree::parse(filter),
    };

    Some(StyleLayer {
        id: id.to_string(),
        source: String::from(json_value["source-layer"].as_str().unwrap_or_default()),
        min_zoom: zoom_field(json_value, "minzoom", config::DEFAULT_MIN_ZOOM),
        max_zoom: zoom_field(json_value, "maxzoom", config::DEFAULT_MAX_ZOOM),
        filter,
        kind,
    })
}

fn property(section: &Value, name: &str) -> ExprTree {
    match &section[name] {
        Value::Null => ExprTree::Empty,
        token => ExprTree::parse(token),
    }
}

// Fractional zoom bounds are truncated.
fn zoom_field(json_value: &Value, name: &str, default: u32) -> u32 {
    json_value[name]
        .as_f64()
        .map(|z| z.max(0.0) as u32)
        .unwrap_or(default)
}

// "{name}" is the legacy token form of ["get", "name"].
fn text_field(token: &Value) -> ExprTree {
    match token.as_str() {
        Some(field) if field.starts_with('{') && field.ends_with('}') => {
            ExprTree::Get(field.trim_start_matches('{').trim_end_matches('}').to_string())
        }
        Some(field) => ExprTree::Static(field.into()),
        None if token.is_null() => ExprTree::Empty,
        None => ExprTree::parse(token),
    }
}

// [1, 2] or ["literal", [1, 2]]; a dash pattern needs an even number of entries
fn dash_array(token: &Value) -> Option<Vec<f64>> {
    let values = match token.as_array()?.as_slice() {
        [Value::String(tag), Value::Array(values)] if tag == "literal" => values,
        _ => token.as_array()?,
    };
    let dashes = values.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>()?;
    if dashes.is_empty() || dashes.len() % 2 == 1 {
        debug!("Ignoring dash array {}", token);
        return None;
    }
    Some(dashes)
}
