pub mod pbf;
pub mod transformation;
