// Domain layer: models and ports. Concrete network sources live under adapters.

pub mod model;
pub mod ports;
