// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/
use super::common::types::Attributes;
use super::expression::ExprTree;
use super::filter::FilterTree;
use super::value::Color;
use super::vector_tile_id::VectorTileID;

#[derive(Debug, Default)]
pub struct Style {
    pub name: String,
    pub layers: Vec<StyleLayer>,
    pub sources: Vec<Source>,
}

impl Style {
    pub fn new() -> Style {
        Style::default()
    }

    pub fn layer(&self, id: &str) -> Option<&StyleLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|source| source.name == name)
    }

    /// True when some layer draws the tile layer `name` at zoom `z`. The
    /// decoder skips tile layers for which this is false.
    pub fn includes_source_layer(&self, name: &str, z: u32) -> bool {
        self.layers.iter().any(|layer| layer.applies_to(name, z))
    }

    /// Style layers drawing tile layer `name` at zoom `z`, in paint order.
    pub fn layers_for<'a>(&'a self, name: &'a str, z: u32) -> impl Iterator<Item = &'a StyleLayer> {
        self.layers.iter().filter(move |layer| layer.applies_to(name, z))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleLayer {
    pub id: String,
    // "source-layer": the tile layer this style layer draws
    pub source: String,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub filter: Option<FilterTree>,
    pub kind: LayerKind,
}

impl StyleLayer {
    pub fn is_visible(&self, attrs: &Attributes) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter.evaluate(attrs))
    }

    pub fn covers_zoom(&self, z: u32) -> bool {
        self.min_zoom <= z && z <= self.max_zoom
    }

    pub fn applies_to(&self, source_layer: &str, z: u32) -> bool {
        self.source == source_layer && self.covers_zoom(z)
    }

    /// The expression behind a paint or layout property, by its style name.
    pub fn property(&self, name: &str) -> Option<&ExprTree> {
        let expr = match (&self.kind, name) {
            (LayerKind::Fill(fill), "fill-color") => &fill.fill_color,
            (LayerKind::Fill(fill), "fill-opacity") => &fill.fill_opacity,
            (LayerKind::Line(line), "line-color") => &line.line_color,
            (LayerKind::Line(line), "line-width") => &line.line_width,
            (LayerKind::Line(line), "line-opacity") => &line.line_opacity,
            (LayerKind::Symbol(symbol), "text-field") => &symbol.text_field,
            (LayerKind::Symbol(symbol), "text-size") => &symbol.text_size,
            (LayerKind::Symbol(symbol), "text-color") => &symbol.text_color,
            (LayerKind::Symbol(symbol), "text-opacity") => &symbol.text_opacity,
            (LayerKind::Symbol(symbol), "icon-image") => &symbol.icon_image,
            (LayerKind::Symbol(symbol), "icon-size") => &symbol.icon_size,
            (LayerKind::Symbol(symbol), "icon-color") => &symbol.icon_color,
            (LayerKind::Symbol(symbol), "icon-opacity") => &symbol.icon_opacity,
            (LayerKind::Symbol(symbol), "icon-rotate") => &symbol.icon_rotate,
            (LayerKind::Background(bg), "background-color") => &bg.background_color,
            (LayerKind::Background(bg), "background-opacity") => &bg.background_opacity,
            _ => return None,
        };
        match expr {
            ExprTree::Empty => None,
            expr => Some(expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Fill(FillLayer),
    Line(LineLayer),
    Symbol(SymbolLayer),
    Background(BackgroundLayer),
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Fill(_) => "fill",
            LayerKind::Line(_) => "line",
            LayerKind::Symbol(_) => "symbol",
            LayerKind::Background(_) => "background",
        }
    }
}

// Properties missing from the document are stored as `ExprTree::Empty`, so
// every accessor falls through to its default.

#[derive(Debug, Clone, PartialEq)]
pub struct FillLayer {
    pub fill_color: ExprTree,
    pub fill_opacity: ExprTree,
}

impl FillLayer {
    pub fn fill_color(&self, attrs: &Attributes) -> Color {
        resolve_color(&self.fill_color, attrs)
    }

    pub fn fill_opacity(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.fill_opacity, attrs, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub line_color: ExprTree,
    pub line_width: ExprTree,
    pub line_opacity: ExprTree,
    pub dash_array: Option<Vec<f64>>,
}

impl LineLayer {
    pub fn line_color(&self, attrs: &Attributes) -> Color {
        resolve_color(&self.line_color, attrs)
    }

    pub fn line_width(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.line_width, attrs, 1.0)
    }

    pub fn line_opacity(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.line_opacity, attrs, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLayer {
    pub text_field: ExprTree,
    pub text_size: ExprTree,
    pub text_color: ExprTree,
    pub text_opacity: ExprTree,
    pub text_font: Vec<String>,
    pub text_anchor: String,
    pub icon_image: ExprTree,
    pub icon_size: ExprTree,
    pub icon_color: ExprTree,
    pub icon_opacity: ExprTree,
    pub icon_rotate: ExprTree,
}

impl SymbolLayer {
    /// The label for a feature, if the layer has one and it resolves.
    pub fn text(&self, attrs: &Attributes) -> Option<String> {
        self.text_field.evaluate(attrs).map(|v| v.to_string())
    }

    pub fn text_size(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.text_size, attrs, 16.0)
    }

    pub fn text_color(&self, attrs: &Attributes) -> Color {
        resolve_color(&self.text_color, attrs)
    }

    pub fn text_opacity(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.text_opacity, attrs, 1.0)
    }

    pub fn icon_image(&self, attrs: &Attributes) -> Option<String> {
        self.icon_image.evaluate(attrs).map(|v| v.to_string())
    }

    pub fn icon_size(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.icon_size, attrs, 1.0)
    }

    pub fn icon_color(&self, attrs: &Attributes) -> Color {
        resolve_color(&self.icon_color, attrs)
    }

    pub fn icon_opacity(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.icon_opacity, attrs, 1.0)
    }

    pub fn icon_rotate(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.icon_rotate, attrs, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub background_color: ExprTree,
    pub background_opacity: ExprTree,
}

impl BackgroundLayer {
    pub fn background_color(&self, attrs: &Attributes) -> Color {
        resolve_color(&self.background_color, attrs)
    }

    pub fn background_opacity(&self, attrs: &Attributes) -> f64 {
        resolve_f64(&self.background_opacity, attrs, 1.0)
    }
}

fn resolve_f64(expr: &ExprTree, attrs: &Attributes, default: f64) -> f64 {
    expr.evaluate(attrs)
        .and_then(|v| v.as_f64())
        .unwrap_or(default)
}

fn resolve_color(expr: &ExprTree, attrs: &Attributes) -> Color {
    expr.evaluate(attrs)
        .and_then(|v| v.as_color())
        .unwrap_or(Color::BLACK)
}

// Ref: https://docs.mapbox.com/mapbox-gl-js/style-spec/sources/
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub kind: String,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub tiles: Option<String>,
    pub attribution: Option<String>,
}

impl Source {
    pub fn covers_zoom(&self, z: u32) -> bool {
        self.min_zoom <= z && z <= self.max_zoom
    }

    pub fn tile_url(&self, tile_id: &VectorTileID) -> Option<String> {
        self.tiles.as_ref().map(|template| {
            template
                .replace("{x}", tile_id.x.to_string().as_ref())
                .replace("{y}", tile_id.y.to_string().as_ref())
                .replace("{z}", tile_id.z.to_string().as_ref())
        })
    }
}
