pub mod color;
pub mod common;
pub mod expression;
pub mod filter;
pub mod style;
pub mod style_model;
pub mod utils;
pub mod value;
pub mod vector_tile_decoder;
pub mod vector_tile_id;
pub mod vector_tile_manager;
pub mod vector_tile_model;

mod scope;
