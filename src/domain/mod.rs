// Domain layer: detection models and the ports the pipeline depends on.

pub mod model;
pub mod ports;
