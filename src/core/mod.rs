pub mod dispatcher;
pub mod engine;
pub mod file_id;
pub mod intake;
pub mod messages;
pub mod pipeline;
pub mod profile;
pub mod split;

pub use crate::domain::model::{ConversionJob, ConversionOutput, DeliveryReport};
pub use crate::domain::ports::{BotApi, Pipeline, Transcoder, Workspace};
pub use crate::utils::error::Result;
