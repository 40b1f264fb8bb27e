mod constant_pool;
mod format_check;
mod parser;
mod structs;

pub use constant_pool::*;
pub use format_check::format_check;
pub use parser::{ParseError, parse_class};
pub use structs::*;
