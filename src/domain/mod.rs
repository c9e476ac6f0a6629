// Domain layer: core models, canonical payloads and ports. No network code here.

pub mod model;
pub mod payload;
pub mod ports;
