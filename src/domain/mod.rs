// Domain layer: models and ports. No HTTP client or runtime specifics here.

pub mod model;
pub mod ports;
