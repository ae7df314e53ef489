pub mod geo;
pub mod maps;
