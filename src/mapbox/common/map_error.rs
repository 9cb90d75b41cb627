use failure::Fail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapErrorTag {
    Pbf,
    Style,
    Io,
}

#[derive(Debug, Fail)]
#[fail(display = "{:?} error: {}", tag, msg)]
pub struct MapError {
    pub tag: MapErrorTag,
    pub msg: String,
}

impl MapError {
    pub fn new(tag: MapErrorTag, msg: String) -> MapError {
        MapError { tag, msg }
    }

    pub fn pbf(msg: &str) -> MapError {
        MapError::new(MapErrorTag::Pbf, msg.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::new(MapErrorTag::Style, err.to_string())
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        MapError::new(MapErrorTag::Io, err.to_string())
    }
}
