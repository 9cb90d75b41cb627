use super::super::style_model::Style;
use super::super::value::Value;

use std::collections::HashMap;
use std::sync::Arc;

// Per-feature attribute set. Pseudo-keys such as "$zoom" and "$type" live
// alongside the tile's own tags.
pub type Attributes = HashMap<String, Value>;

// A style is built once and then only read, so it is shared by reference
// across decode workers.
pub type SharedStyle = Arc<Style>;

pub const ZOOM_KEY: &str = "$zoom";
pub const TYPE_KEY: &str = "$type";
