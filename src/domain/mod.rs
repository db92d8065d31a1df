// Domain layer: definitions, parameters and the store port. No engine logic here.

pub mod model;
pub mod ports;
