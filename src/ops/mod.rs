pub mod adjustments;
pub mod canvas_ops;
pub mod fill;
pub mod raster;
pub mod shapes;
pub mod transform;
