//! A streaming JSON codec with a type coercion registry.
//!
//! [`JsonInput`] pulls typed tokens out of a character source and
//! [`JsonOutput`] pushes values out as text. Between them sits the
//! [`TypeCoercer`], which turns JSON into application types and back without
//! code generation: every type describes itself through [`Coercible`], and
//! the registry resolves and caches a reader and a writer for it.
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! let ports: BTreeMap<String, u16> = jsonwire::from_json(r#"{"http": 80, "https": "443"}"#)?.unwrap();
//! assert_eq!(ports["https"], 443);
//! assert_eq!(jsonwire::to_json(&ports)?, r#"{"http":80,"https":443}"#);
//! # Ok::<(), jsonwire::JsonError>(())
//! ```

#![allow(missing_docs)]

mod capabilities;
pub mod coerce;
mod error;
pub mod input;
pub mod introspect;
mod json;
mod number;
mod options;
pub mod output;
mod value;

#[cfg(test)]
mod tests;

pub use capabilities::Capabilities;
pub use coerce::{Coercer, CoercerKind, Coercible, Factory, JsonEnum, ReadFn, TypeCoercer, TypeDescriptor, WriteFn};
pub use error::{JsonError, LexicalError, Location, Result};
pub use input::{CharSource, JsonInput, ReadSource, TokenKind};
pub use introspect::{CLASS_PROPERTY, Property, PropertyMap, Structure};
pub use json::{Json, from_json, to_json};
pub use number::{Number, ParseNumberError};
pub use options::{OutputOptions, PropertySetting};
pub use output::JsonOutput;
pub use value::{Array, Map, Value};
