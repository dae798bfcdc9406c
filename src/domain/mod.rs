// Domain layer: port records, stage results and the seams (traits) the engine talks through.

pub mod model;
pub mod ports;
