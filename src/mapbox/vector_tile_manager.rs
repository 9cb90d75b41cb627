use super::common::async_executor::AsyncExecutor;
use super::common::map_error::MapError;
use super::common::types::SharedStyle;
use super::style_model::Style;
use super::vector_tile_decoder::{decode_tile, DecodedTile};
use super::vector_tile_id::VectorTileID;
use super::vector_tile_model::VectorTileModel;

use log::{debug, warn};
use std::sync::mpsc::channel;

/// Decodes raw tile buffers on a worker pool against an optional shared style.
pub struct VectorTileManager {
    style: Option<SharedStyle>,
    executor: AsyncExecutor,
}

impl VectorTileManager {
    pub fn new(style: Option<SharedStyle>, workers: usize) -> VectorTileManager {
        VectorTileManager {
            style,
            executor: AsyncExecutor::new(workers),
        }
    }

    pub fn decode_tile_bytes(
        data: &[u8],
        tile_id: &VectorTileID,
        style: Option<&Style>,
    ) -> Result<DecodedTile, MapError> {
        let model = VectorTileModel::parse(data)?;
        debug!("Parsed VectorTile {} with {} layers", tile_id, model.layers.len());
        Ok(decode_tile(&model, tile_id, style))
    }

    /// Decodes every buffer in parallel. Results come back in request order.
    pub fn decode_tiles(
        &self,
        tiles: Vec<(VectorTileID, Vec<u8>)>,
    ) -> Vec<(VectorTileID, Result<DecodedTile, MapError>)> {
        let count = tiles.len();
        let (sender, receiver) = channel();

        for (inx, (tile_id, data)) in tiles.into_iter().enumerate() {
            let sender = sender.clone();
            let style = self.style.clone();
            self.executor.queue_task(move || {
                let result =
                    VectorTileManager::decode_tile_bytes(&data, &tile_id, style.as_deref());
                // The receiver only goes away if the caller stopped waiting.
                let _ = sender.send((inx, tile_id, result));
            });
        }
        drop(sender);

        let mut results: Vec<_> = receiver.iter().take(count).collect();
        results.sort_by_key(|(inx, _, _)| *inx);
        results
            .into_iter()
            .map(|(_, tile_id, result)| {
                if let Err(err) = &result {
                    warn!("VectorTile {} failed to decode: {}", tile_id, err);
                }
                (tile_id, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapbox::style;
    use crate::mapbox::vector_tile_model::tests::{feature, int_value, layer, tile};
    use serde_json::json;
    use std::sync::Arc;

    fn sample_tile() -> Vec<u8> {
        tile(&[
            layer(
                "road",
                4096,
                &["vt_code"],
                &[int_value(2701)],
                &[feature(2, &[0, 0], &[9, 0, 0, 10, 8, 8])],
            ),
            layer(
                "building",
                4096,
                &[],
                &[],
                &[feature(3, &[], &[9, 0, 0, 26, 8, 0, 0, 8, 7, 0, 15])],
            ),
        ])
    }

    #[test]
    fn decodes_batches_in_request_order() {
        let manager = VectorTileManager::new(None, 3);
        let ids: Vec<VectorTileID> = (0..8).map(|x| VectorTileID::new(x, 3, 4)).collect();
        let mut requests: Vec<_> = ids.iter().map(|id| (*id, sample_tile())).collect();
        requests[5].1 = vec![0x1A, 0x10];

        let results = manager.decode_tiles(requests);
        assert_eq!(results.len(), 8);
        for (i, (id, result)) in results.iter().enumerate() {
            assert_eq!(*id, ids[i]);
            assert_eq!(result.is_err(), i == 5);
        }
        let decoded = results[0].1.as_ref().unwrap();
        assert_eq!(decoded.layers.len(), 2);
    }

    #[test]
    fn shared_style_culls_layers() {
        let style = style::load(&json!({
            "layers": [{"id": "r", "type": "line", "source-layer": "road", "minzoom": 4}]
        }));
        let manager = VectorTileManager::new(Some(Arc::new(style)), 2);
        let results = manager.decode_tiles(vec![
            (VectorTileID::new(0, 0, 3), sample_tile()),
            (VectorTileID::new(8, 5, 4), sample_tile()),
        ]);
        let at_z3 = results[0].1.as_ref().unwrap();
        let at_z4 = results[1].1.as_ref().unwrap();
        assert!(at_z3.layers.is_empty());
        assert_eq!(at_z4.layers.len(), 1);
        assert_eq!(at_z4.layers[0].name, "road");
    }
}
