// Domain layer: input records, prediction results and the ports the pipelines depend on.

pub mod model;
pub mod ports;
