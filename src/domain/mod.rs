// Domain layer: Telegram/job models and ports (interfaces).

pub mod model;
pub mod ports;
