//! Training internals: corpus ingestion, the merge queue, and the trainer.

pub mod corpus;
pub mod queue;
pub mod trainer;
