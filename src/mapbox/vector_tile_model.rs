// https://docs.mapbox.com/vector-tiles/specification/
//
// [Attribute Encoding]
// Attributes are encoded in a series of tags that exist within a feature in the vector that have
// integer values that reference keys and values designating the original key:value pairs from the
// geometry. For large geometry, this removes redundancy for attributes that have the same keys and
// similar values.
//
// The geometry command stream is kept as raw integers here; `vector_tile_decoder` walks it.
//
// https://github.com/mapbox/vector-tile-spec/blob/master/2.1/vector_tile.proto

use super::common::map_error::MapError;
use super::utils::pbf::Pbf;
use super::value::Value;
use crate::config;

use std::convert::TryFrom;

#[derive(Debug, Default)]
pub struct VectorTileModel {
    pub layers: Vec<VectorTileLayer>,
}

impl VectorTileModel {
    pub fn parse(bytes: &[u8]) -> Result<Self, MapError> {
        let mut data = Pbf::new(bytes);
        let mut vector_tile_model = VectorTileModel::default();

        while data.next()? {
            if data.tag == 3 {
                let mut layer_msg = data.message()?;
                let layer = VectorTileLayer::parse(&mut layer_msg)?;
                vector_tile_model.layers.push(layer);
            } else {
                data.skip()?;
            }
        }
        Ok(vector_tile_model)
    }
}

#[derive(Debug)]
pub struct VectorTileLayer {
    pub name: String,
    pub features: Vec<VectorTileFeature>,
    pub keys: Vec<String>,
    pub values: Vec<VectorTileValue>,
    pub extent: u32,
}

impl Default for VectorTileLayer {
    fn default() -> Self {
        VectorTileLayer {
            name: String::new(),
            features: vec![],
            keys: vec![],
            values: vec![],
            extent: config::DEFAULT_EXTENT,
        }
    }
}

impl VectorTileLayer {
    pub fn parse(data: &mut Pbf) -> Result<Self, MapError> {
        let mut layer = VectorTileLayer::default();

        while data.next()? {
            match data.tag {
                1 => {
                    // name
                    layer.name = data.string()?;
                }
                2 => {
                    // feature
                    let mut msg = data.message()?;
                    layer.features.push(VectorTileFeature::parse(&mut msg)?);
                }
                3 => {
                    // keys
                    layer.keys.push(data.string()?);
                }
                4 => {
                    // values
                    let mut msg = data.message()?;
                    layer.values.push(VectorTileValue::parse(&mut msg)?);
                }
                5 => {
                    // extent
                    layer.extent = data.varint32()?;
                }
                _ => {
                    data.skip()?;
                }
            }
        }

        Ok(layer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorTileValue {
    None,
    StringVal(String),
    Float32Val(f32),
    Float64Val(f64),
    Int64Val(i64),
    UInt64Val(u64),
    SInt64Val(i64),
    BoolVal(bool),
}

impl VectorTileValue {
    pub fn parse(data: &mut Pbf) -> Result<Self, MapError> {
        let mut val = VectorTileValue::None;
        while data.next()? {
            val = match data.tag {
                // string_value
                1 => VectorTileValue::StringVal(data.string()?),
                // float_value
                2 => VectorTileValue::Float32Val(data.fixed32()?),
                // double_value
                3 => VectorTileValue::Float64Val(data.fixed64()?),
                // int_value, two's complement
                4 => VectorTileValue::Int64Val(data.varint64()? as i64),
                // uint_value
                5 => VectorTileValue::UInt64Val(data.varint64()?),
                // sint_value
                6 => VectorTileValue::SInt64Val(data.svarint64()?),
                // bool_value
                7 => VectorTileValue::BoolVal(data.boolean()?),
                _ => {
                    data.skip()?;
                    continue;
                }
            };
        }
        Ok(val)
    }

    /// `None` for a value message that carried no field.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            VectorTileValue::None => None,
            VectorTileValue::StringVal(v) => Some(Value::String(v.clone())),
            VectorTileValue::Float32Val(v) => Some(Value::Float(*v as f64)),
            VectorTileValue::Float64Val(v) => Some(Value::Float(*v)),
            VectorTileValue::Int64Val(v) | VectorTileValue::SInt64Val(v) => Some(Value::Int(*v)),
            VectorTileValue::UInt64Val(v) => Some(
                i64::try_from(*v)
                    .map(Value::Int)
                    .unwrap_or(Value::Float(*v as f64)),
            ),
            VectorTileValue::BoolVal(v) => Some(Value::Bool(*v)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VectorTileFeature {
    pub id: u64,
    pub r#type: u32,
    // (key index, value index) pairs, flattened
    pub tags: Vec<u32>,
    pub geometry: Vec<u32>,
}

impl VectorTileFeature {
    pub fn parse(data: &mut Pbf) -> Result<Self, MapError> {
        let mut vector_tile_feature = VectorTileFeature::default();

        while data.next()? {
            match data.tag {
                1 => {
                    // id
                    vector_tile_feature.id = data.varint64()?;
                }
                2 => {
                    // tags
                    data.repeated_u32(&mut vector_tile_feature.tags)?;
                }
                3 => {
                    // type
                    vector_tile_feature.r#type = data.varint32()?;
                }
                4 => {
                    // geometry
                    data.repeated_u32(&mut vector_tile_feature.geometry)?;
                }
                _ => {
                    data.skip()?;
                }
            }
        }

        Ok(vector_tile_feature)
    }
}
