use std::{
    io::{self, Read},
    sync::{Arc, LazyLock},
};

use crate::{
    Coercer, JsonInput, JsonOutput, OutputOptions, PropertySetting, ReadSource, TypeCoercer,
    coerce::Coercible,
    error::{JsonError, Result},
};

/// The codec facade: a shared registry plus output options.
///
/// Cloning is cheap; clones share the registry and its cache.
///
/// ```
/// use jsonwire::{Json, Value};
///
/// let json = Json::new();
/// let v: Value = json.to_type(r#"{"a": [1, 2.0, "x"]}"#)?.unwrap();
/// assert_eq!(json.to_json(&v)?, r#"{"a":[1,2.0,"x"]}"#);
/// assert_eq!(json.to_type::<Value>("   ")?, None);
/// # Ok::<(), jsonwire::JsonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Json {
    coercer: Arc<TypeCoercer>,
    options: OutputOptions,
    max_nesting: usize,
}

impl Default for Json {
    fn default() -> Self {
        Self::new()
    }
}

impl Json {
    /// Nesting budget of [`Json::to_json`].
    pub const DEFAULT_MAX_DEPTH: usize = OutputOptions::DEFAULT_MAX_DEPTH;

    /// A codec with only the built-in coercers. Records are written without
    /// their `class` property.
    #[must_use]
    pub fn new() -> Self {
        Self::with_coercers(Vec::new())
    }

    /// A codec that consults `coercers` before the built-in ones.
    pub fn with_coercers(coercers: impl IntoIterator<Item = Box<dyn Coercer>>) -> Self {
        Self {
            coercer: Arc::new(TypeCoercer::with_coercers(coercers)),
            options: OutputOptions {
                write_class_name: false,
                ..OutputOptions::default()
            },
            max_nesting: JsonInput::DEFAULT_MAX_NESTING,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    /// Limits how many arrays and maps parsers created here may have open at
    /// once. See [`JsonInput::set_max_nesting`].
    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Switches on pretty printing.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.options.pretty_print = true;
        self
    }

    #[must_use]
    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Serializes `value` with the configured depth budget.
    ///
    /// # Errors
    ///
    /// [`JsonError::DepthLimit`] for values nested too deeply, or a
    /// resolution error if `T` cannot be written.
    pub fn to_json<T: Coercible>(&self, value: &T) -> Result<String> {
        self.to_json_with_depth(value, self.options.max_depth)
    }

    /// Serializes `value` allowing `max_depth` levels of nesting.
    ///
    /// # Errors
    ///
    /// As for [`Json::to_json`].
    pub fn to_json_with_depth<T: Coercible>(&self, value: &T, max_depth: usize) -> Result<String> {
        let mut buf = Vec::new();
        let mut out = self.new_output(&mut buf);
        out.write_with_depth(value, max_depth)?;
        out.finish()?;
        String::from_utf8(buf).map_err(|e| JsonError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Parses `text` as a `T`. Empty or whitespace-only text, and `null` for
    /// a type without a null form, give `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Lexical and structural errors in `text`, including anything but
    /// whitespace after the value.
    pub fn to_type<T: Coercible>(&self, text: &str) -> Result<Option<T>> {
        self.to_type_with(text, PropertySetting::ByName)
    }

    /// Parses `text` as a `T`, discovering record properties in `setting`
    /// mode.
    ///
    /// # Errors
    ///
    /// As for [`Json::to_type`].
    pub fn to_type_with<T: Coercible>(&self, text: &str, setting: PropertySetting) -> Result<Option<T>> {
        let mut input = self.new_input(text);
        input.property_setting(setting);
        let value = input.read::<T>()?;
        input.consume_trailing_whitespace()?;
        Ok(value)
    }

    /// A parser over `text` sharing this codec's registry.
    #[must_use]
    pub fn new_input<'a>(&self, text: &'a str) -> JsonInput<'a> {
        self.configure(JsonInput::new(text.chars(), Arc::clone(&self.coercer)))
    }

    /// A parser decoding UTF-8 from `reader`.
    pub fn new_reader_input<'a>(&self, reader: impl Read + 'a) -> JsonInput<'a> {
        self.configure(JsonInput::new(ReadSource::new(reader), Arc::clone(&self.coercer)))
    }

    /// A writer sending text to `out` with this codec's options.
    pub fn new_output<'w>(&self, out: impl io::Write + 'w) -> JsonOutput<'w> {
        JsonOutput::new(out, Arc::clone(&self.coercer), self.options)
    }

    fn configure<'a>(&self, mut input: JsonInput<'a>) -> JsonInput<'a> {
        input.set_max_nesting(self.max_nesting);
        input
    }
}

static DEFAULT: LazyLock<Json> = LazyLock::new(Json::new);

/// Serializes `value` with a process-wide default [`Json`].
///
/// # Errors
///
/// As for [`Json::to_json`].
pub fn to_json<T: Coercible>(value: &T) -> Result<String> {
    DEFAULT.to_json(value)
}

/// Parses `text` with a process-wide default [`Json`].
///
/// # Errors
///
/// As for [`Json::to_type`].
pub fn from_json<T: Coercible>(text: &str) -> Result<Option<T>> {
    DEFAULT.to_type(text)
}
