//! Class file encoding
//!
//! A class is assembled with a [`class_file::ClassFileBuilder`]. Fields and methods are added
//! through callbacks that receive the attribute table of the member along with the shared
//! constant pool, so constants can be interned in the middle of writing an attribute.
//!
//! ```
//! use classasm::jvm::code::{InstructionEncoder, Opcode};
//! use classasm::jvm::class_file::ClassFileBuilder;
//! use classasm::jvm::{ClassAccessFlags, Error, MethodAccessFlags, Version};
//!
//! # fn main() -> Result<(), Error> {
//! let mut class = ClassFileBuilder::new(
//!     Version::JAVA8,
//!     ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
//!     "me/Hello",
//!     Some("java/lang/Object"),
//! )?;
//! class.method(
//!     MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     "main",
//!     "([Ljava/lang/String;)V",
//!     |attributes, pool| {
//!         let out = pool.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")?;
//!         let println = pool.get_method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V")?;
//!         let hello = pool.get_string("Hello, world!")?;
//!
//!         let mut code = InstructionEncoder::new();
//!         code.constant(Opcode::GetStatic, out)?;
//!         code.ldc(hello)?;
//!         code.constant(Opcode::InvokeVirtual, println)?;
//!         code.op(Opcode::Return)?;
//!         attributes.code(pool, 2, 1, code.finish()?, |_, _| Ok(()))
//!     },
//! )?;
//! class.attributes(|attributes, pool| attributes.source_file(pool, "Hello.java"))?;
//!
//! let bytes = class.finish()?.into_bytes();
//! assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok(())
//! # }
//! ```

mod access_flags;
pub mod attributes;
mod binary_format;
pub mod class_file;
pub mod code;
pub mod constants;
mod errors;
pub mod translate;
mod version;

pub use access_flags::*;
pub use binary_format::*;
pub use errors::*;
pub use version::*;
