//! Assemble JVM class files
//!
//! The interesting parts of emitting a class file are all about forward references: the constant
//! pool count is only known once every constant has been added, attribute lengths are only known
//! once their bodies are written, and branch offsets are only known once their targets are placed.
//! Everything in this crate is built on [`util::BlobBuilder`], a byte sink that lets you reserve a
//! region now, fill it in later, and splice whole buffers together without copying.
//!
//! See [`jvm`] for an end to end example.

pub mod jvm;
pub mod util;
