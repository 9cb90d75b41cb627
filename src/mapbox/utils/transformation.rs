// Spherical Mercator (EPSG:3857) on the slippy-map tile grid.
// Ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames

use super::super::vector_tile_id::VectorTileID;
use std::f64::consts;

pub fn zigzag_decode(n: u32) -> i32 {
    (n >> 1) as i32 ^ -((n & 1) as i32)
}

pub fn zigzag_encode(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

pub struct Transformation {}

impl Transformation {
    /// Projects a tile-local coordinate (`0..extent` on both axes, y pointing
    /// south) to `(lon, lat)` in degrees.
    pub fn tile_to_lonlat(x: f64, y: f64, extent: u32, tile: &VectorTileID) -> (f64, f64) {
        let extent = extent as f64;
        let size = extent * 2f64.powi(tile.z as i32);
        let wx = (tile.x as f64 * extent + x) / size;
        let wy = (tile.y as f64 * extent + y) / size;

        let lon = wx * 360.0 - 180.0;
        let lat = (consts::PI * (1.0 - 2.0 * wy)).sinh().atan() * 180.0 / consts::PI;
        (lon, lat)
    }

    /// The tile at zoom `z` containing `(lon, lat)`. Latitudes beyond the
    /// Mercator limit clamp to the first or last row.
    pub fn lonlat_to_tile(lon: f64, lat: f64, z: u32) -> VectorTileID {
        let n = 2f64.powi(z as i32);
        let max = n as u32 - 1;
        let lat = lat.to_radians();

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / consts::PI) / 2.0 * n).floor();
        let clamp = |v: f64| {
            if v.is_nan() || v < 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };
        VectorTileID::new(clamp(x), clamp(y), z)
    }

    /// `(west, south, east, north)` of a tile in degrees.
    pub fn tile_bounds(tile: &VectorTileID) -> (f64, f64, f64, f64) {
        let (west, north) = Transformation::tile_to_lonlat(0.0, 0.0, 1, tile);
        let (east, south) = Transformation::tile_to_lonlat(1.0, 1.0, 1, tile);
        (west, south, east, north)
    }
}
