//! Attribute tables
//!
//! Classes, fields, methods, record components, and `Code` attributes all end with a table of
//! attributes. Every attribute is stored the same way (name, `u4` length, body) but the bodies
//! have very different shapes. [`AttributeTableEncoder`] writes the table, and each predefined
//! attribute gets a method on it that interns its own name and builds its body.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7

mod annotations;
mod class_attributes;
mod encoder;
mod member_attributes;
mod module;
pub mod names;
mod record;
mod stack_map;
mod table;

pub use annotations::*;
pub use class_attributes::*;
pub use encoder::*;
pub use member_attributes::*;
pub use module::*;
pub use record::*;
pub use stack_map::*;
pub use table::*;

use member_attributes::write_table;
