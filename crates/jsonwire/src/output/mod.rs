//! The streaming push writer.
//!
//! [`JsonOutput`] writes JSON text as values are pushed into it, checking
//! that the calls form a single well-formed document:
//!
//! ```
//! use jsonwire::Json;
//!
//! let json = Json::new();
//! let mut buf = Vec::new();
//! let mut out = json.new_output(&mut buf);
//! out.begin_map()?
//!     .name("ok")?
//!     .write_bool(true)?
//!     .name("ids")?
//!     .write(&vec![1, 2])?
//!     .end_map()?;
//! out.finish()?;
//! assert_eq!(String::from_utf8(buf).unwrap(), r#"{"ok":true,"ids":[1,2]}"#);
//! # Ok::<(), jsonwire::JsonError>(())
//! ```
use std::{io, sync::Arc};

use crate::{
    Number, OutputOptions, PropertySetting, TypeCoercer,
    coerce::Coercible,
    error::{JsonError, Result},
};

pub(crate) mod escape;

/// Whether a map owes a name or a value next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Name,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Root { written: bool },
    Array { empty: bool },
    Map { empty: bool, slot: Slot },
}

/// A push writer over any [`io::Write`].
pub struct JsonOutput<'w> {
    out: Box<dyn io::Write + 'w>,
    coercer: Arc<TypeCoercer>,
    options: OutputOptions,
    /// The budget of the write in progress, reported in depth errors.
    max_depth: usize,
    stack: Vec<Node>,
}

impl<'w> JsonOutput<'w> {
    /// Creates a writer that sends text to `out`.
    pub fn new(out: impl io::Write + 'w, coercer: Arc<TypeCoercer>, options: OutputOptions) -> Self {
        Self {
            out: Box::new(out),
            coercer,
            max_depth: options.max_depth,
            options,
            stack: vec![Node::Root { written: false }],
        }
    }

    /// Toggles emission of the synthetic `class` property of records.
    pub fn write_class_name(&mut self, enabled: bool) -> &mut Self {
        self.options.write_class_name = enabled;
        self
    }

    #[must_use]
    pub fn writes_class_name(&self) -> bool {
        self.options.write_class_name
    }

    /// Switches the property discovery mode used for records, returning the
    /// previous mode.
    pub fn set_property_setting(&mut self, setting: PropertySetting) -> PropertySetting {
        core::mem::replace(&mut self.options.property_setting, setting)
    }

    #[must_use]
    pub fn property_setting(&self) -> PropertySetting {
        self.options.property_setting
    }

    pub(crate) fn coercer(&self) -> &TypeCoercer {
        &self.coercer
    }

    /// Opens an array.
    ///
    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn begin_array(&mut self) -> Result<&mut Self> {
        self.before_value()?;
        self.raw("[")?;
        self.stack.push(Node::Array { empty: true });
        Ok(self)
    }

    /// Closes the innermost container, which must be an array.
    ///
    /// # Errors
    ///
    /// A structural error if the innermost container is not an array.
    pub fn end_array(&mut self) -> Result<&mut Self> {
        let Some(&Node::Array { empty }) = self.stack.last() else {
            return Err(JsonError::structural("attempt to close an array that is not open"));
        };
        self.stack.pop();
        if !empty {
            self.newline()?;
        }
        self.raw("]")?;
        Ok(self)
    }

    /// Opens a map.
    ///
    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn begin_map(&mut self) -> Result<&mut Self> {
        self.before_value()?;
        self.raw("{")?;
        self.stack.push(Node::Map {
            empty: true,
            slot: Slot::Name,
        });
        Ok(self)
    }

    /// Closes the innermost container, which must be a map that does not owe
    /// a value.
    ///
    /// # Errors
    ///
    /// A structural error otherwise.
    pub fn end_map(&mut self) -> Result<&mut Self> {
        let Some(&Node::Map { empty, slot }) = self.stack.last() else {
            return Err(JsonError::structural("attempt to close a map that is not open"));
        };
        if slot == Slot::Value {
            return Err(JsonError::structural("attempt to close a map while a value is owed"));
        }
        self.stack.pop();
        if !empty {
            self.newline()?;
        }
        self.raw("}")?;
        Ok(self)
    }

    /// Writes the name of the next map entry.
    ///
    /// # Errors
    ///
    /// A structural error outside a map or when a value is owed.
    pub fn name(&mut self, name: &str) -> Result<&mut Self> {
        let Some(Node::Map { empty, slot }) = self.stack.last_mut() else {
            return Err(JsonError::structural(format!("name '{name}' written outside of a map")));
        };
        if *slot == Slot::Value {
            return Err(JsonError::structural(format!("name '{name}' written while a value is owed")));
        }
        let first = core::mem::replace(empty, false);
        *slot = Slot::Value;
        if !first {
            self.raw(",")?;
        }
        self.newline()?;
        self.write_quoted(name)?;
        self.raw(if self.options.pretty_print { ": " } else { ":" })?;
        Ok(self)
    }

    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn write_null(&mut self) -> Result<&mut Self> {
        self.before_value()?;
        self.raw("null")?;
        Ok(self)
    }

    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn write_bool(&mut self, value: bool) -> Result<&mut Self> {
        self.before_value()?;
        self.raw(if value { "true" } else { "false" })?;
        Ok(self)
    }

    /// Writes a number. Integers are written without a fraction, floats
    /// always with a `.0` or an exponent; NaN and infinities become `null`.
    ///
    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn write_number(&mut self, value: impl Into<Number>) -> Result<&mut Self> {
        let n = value.into();
        if n.is_f64() && !n.as_f64().is_finite() {
            return self.write_null();
        }
        self.before_value()?;
        self.raw(&n.to_string())?;
        Ok(self)
    }

    /// Writes a string, escaped.
    ///
    /// # Errors
    ///
    /// A structural error where a value is not allowed.
    pub fn write_str(&mut self, value: &str) -> Result<&mut Self> {
        self.before_value()?;
        self.write_quoted(value)?;
        Ok(self)
    }

    /// Writes any [`Coercible`] value within the configured depth budget.
    ///
    /// # Errors
    ///
    /// [`JsonError::DepthLimit`] if the value nests too deeply, otherwise as
    /// for the value's writer.
    pub fn write<T: Coercible>(&mut self, value: &T) -> Result<&mut Self> {
        self.write_with_depth(value, self.options.max_depth)
    }

    /// Writes a value allowing at most `max_depth` levels of nesting.
    ///
    /// # Errors
    ///
    /// As for [`JsonOutput::write`].
    pub fn write_with_depth<T: Coercible>(&mut self, value: &T, max_depth: usize) -> Result<&mut Self> {
        self.max_depth = max_depth;
        self.write_value(value, max_depth)
    }

    /// Writes a value with `depth_remaining` levels of nesting left. Used by
    /// writers of composite values for their children.
    ///
    /// # Errors
    ///
    /// As for [`JsonOutput::write`].
    pub fn write_value<T: Coercible>(&mut self, value: &T, depth_remaining: usize) -> Result<&mut Self> {
        let coercer = Arc::clone(&self.coercer);
        coercer.write(value, self, depth_remaining)?;
        Ok(self)
    }

    /// Spends one level of the depth budget, returning what is left for
    /// children.
    ///
    /// # Errors
    ///
    /// [`JsonError::DepthLimit`] once the budget is exhausted.
    pub fn descend(&self, depth_remaining: usize) -> Result<usize> {
        depth_remaining.checked_sub(1).ok_or(JsonError::DepthLimit {
            max_depth: self.max_depth,
        })
    }

    /// Checks that every container was closed and flushes the sink.
    ///
    /// # Errors
    ///
    /// A structural error for an incomplete document, or an I/O error.
    pub fn finish(mut self) -> Result<()> {
        if self.stack.len() > 1 {
            return Err(JsonError::structural(format!(
                "{} container(s) left open",
                self.stack.len() - 1
            )));
        }
        self.out.flush()?;
        Ok(())
    }

    /// Accounts for a value about to be written in the innermost container.
    fn before_value(&mut self) -> Result<()> {
        let newline = match self.stack.last_mut() {
            Some(Node::Root { written: true }) => {
                return Err(JsonError::structural("only one top-level value can be written"));
            }
            Some(Node::Root { written }) => {
                *written = true;
                false
            }
            Some(Node::Array { empty }) => {
                if !core::mem::replace(empty, false) {
                    self.raw(",")?;
                }
                true
            }
            Some(Node::Map { slot: Slot::Name, .. }) => {
                return Err(JsonError::structural("a value was written where a name is expected"));
            }
            Some(Node::Map { slot, .. }) => {
                *slot = Slot::Name;
                false
            }
            None => return Err(JsonError::structural("the document is already complete")),
        };
        if newline {
            self.newline()?;
        }
        Ok(())
    }

    /// Breaks the line and indents to the current depth when pretty printing.
    fn newline(&mut self) -> Result<()> {
        if self.options.pretty_print {
            let indent = "  ".repeat(self.stack.len() - 1);
            self.raw("\n")?;
            self.raw(&indent)?;
        }
        Ok(())
    }

    fn write_quoted(&mut self, value: &str) -> Result<()> {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('"');
        escape::push_escaped(&mut quoted, value);
        quoted.push('"');
        self.raw(&quoted)
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for JsonOutput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonOutput")
            .field("options", &self.options)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(options: OutputOptions, build: impl FnOnce(&mut JsonOutput<'_>) -> Result<()>) -> Result<String> {
        let mut buf = Vec::new();
        let mut out = JsonOutput::new(&mut buf, Arc::default(), options);
        build(&mut out)?;
        out.finish()?;
        Ok(String::from_utf8(buf).unwrap())
    }

    fn compact(build: impl FnOnce(&mut JsonOutput<'_>) -> Result<()>) -> Result<String> {
        render(OutputOptions::default(), build)
    }

    #[test]
    fn writes_nested_containers() {
        let text = compact(|out| {
            out.begin_map()?
                .name("a")?
                .begin_array()?
                .write_number(1)?
                .write_number(2.5)?
                .write_null()?
                .end_array()?
                .name("b")?
                .write_str("x")?
                .end_map()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(text, r#"{"a":[1,2.5,null],"b":"x"}"#);
    }

    #[test]
    fn pretty_printing_indents_by_two() {
        let options = OutputOptions {
            pretty_print: true,
            ..OutputOptions::default()
        };
        let text = render(options, |out| {
            out.begin_map()?
                .name("a")?
                .begin_array()?
                .write_number(1)?
                .end_array()?
                .name("e")?
                .begin_map()?
                .end_map()?
                .end_map()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(text, "{\n  \"a\": [\n    1\n  ],\n  \"e\": {}\n}");
    }

    #[test]
    fn floats_keep_their_fraction() {
        assert_eq!(compact(|out| out.write_number(42.0).map(drop)).unwrap(), "42.0");
        assert_eq!(compact(|out| out.write_number(42).map(drop)).unwrap(), "42");
        assert_eq!(compact(|out| out.write_number(f64::NAN).map(drop)).unwrap(), "null");
    }

    #[test]
    fn protocol_violations_are_structural_errors() {
        let cases: [fn(&mut JsonOutput<'_>) -> Result<()>; 6] = [
            |out| out.begin_map()?.write_bool(true).map(drop),
            |out| out.begin_map()?.name("a")?.name("b").map(drop),
            |out| out.name("a").map(drop),
            |out| out.begin_array()?.end_map().map(drop),
            |out| out.write_null()?.write_null().map(drop),
            |out| out.begin_map()?.name("a")?.end_map().map(drop),
        ];
        for case in cases {
            let err = compact(case).unwrap_err();
            assert!(matches!(err, JsonError::Structural { .. }), "{err}");
        }
    }

    #[test]
    fn finishing_with_open_containers_fails() {
        let err = compact(|out| out.begin_array().map(drop)).unwrap_err();
        assert!(matches!(err, JsonError::Structural { .. }));
    }

    #[test]
    fn descend_reports_the_budget() {
        let mut buf = Vec::new();
        let out = JsonOutput::new(&mut buf, Arc::default(), OutputOptions::default());
        assert_eq!(out.descend(3).unwrap(), 2);
        assert!(matches!(out.descend(0), Err(JsonError::DepthLimit { max_depth: 10 })));
    }
}
