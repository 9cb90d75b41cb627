use super::common::map_error::{MapError, MapErrorTag};
use std::fmt;
use std::str::FromStr;

#[derive(PartialEq, Eq, Hash, Debug, Copy)]
pub struct VectorTileID {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl VectorTileID {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        VectorTileID { x, y, z }
    }
}

impl Clone for VectorTileID {
    fn clone(&self) -> Self {
        *self
    }
}

impl fmt::Display for VectorTileID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

// "z/x/y"
impl FromStr for VectorTileID {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MapError::new(MapErrorTag::Io, format!("invalid tile id '{}'", s));
        let parts = s
            .split('/')
            .map(|p| p.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<u32>, MapError>>()?;
        match parts.as_slice() {
            [z, x, y] if *z < 32 && *x >> *z == 0 && *y >> *z == 0 => {
                Ok(VectorTileID::new(*x, *y, *z))
            }
            _ => Err(invalid()),
        }
    }
}
