mod blob_builder;

pub use blob_builder::*;
