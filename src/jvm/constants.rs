//! Constant pool and everything needed to build one

mod constant;
mod index;
mod modified_utf8;
mod pool;
mod view;

pub use constant::*;
pub use index::*;
pub use modified_utf8::*;
pub use pool::*;
pub use view::*;
