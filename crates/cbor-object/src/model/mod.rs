//! The generic value model.
//!
//! - [`Value`]: a CBOR data item
//! - [`Array`] / [`Map`]: shared container handles
//! - [`SimpleValue`] / [`ItemKind`]
//! - Ordering and equality (`compare`), diagnostic notation (`Display`) and
//!   conversions from Rust values

mod compare;
mod container;
mod convert;
mod display;
mod simple;
mod value;

pub use container::{Array, Map, MapStorage};
pub use convert::{default_converters, Converter, ConverterRegistry};
pub use simple::{ItemKind, SimpleValue};
pub use value::{Value, TAG_UUID};

pub(crate) use display::write_escaped_text;
