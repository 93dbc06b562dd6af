pub mod color;
pub mod heatmap;
