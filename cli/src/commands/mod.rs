//! CLI command implementations.

pub mod decode;
pub mod encode;
pub mod inspect;
pub mod train;

pub use decode::DecodeCommand;
pub use encode::EncodeCommand;
pub use inspect::InspectCommand;
pub use train::TrainCommand;
