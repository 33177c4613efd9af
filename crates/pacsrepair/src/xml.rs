//! XML document model, parser and writer

mod cursor;
pub mod model;
pub mod parser;
pub mod writer;

pub use model::{local_name, Content, Document, Element};
pub use parser::{Config, Parser};
pub use writer::{to_pretty_string, to_string, Writer, WriterConfig};
