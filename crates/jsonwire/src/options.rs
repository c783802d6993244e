/// How record properties are discovered and named.
///
/// # Default
///
/// [`PropertySetting::ByName`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PropertySetting {
    /// Names derive from accessors: `getDisplayName`, `isActive` and
    /// `setDisplayName` become `displayName` and `active`.
    #[default]
    ByName,
    /// Names are the registered field names, used as given.
    ByField,
}

/// Configuration for [`JsonOutput`](crate::JsonOutput).
///
/// # Default
///
/// Compact output, the synthetic `class` property included, and a maximum
/// depth of [`OutputOptions::DEFAULT_MAX_DEPTH`].
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Whether to break lines and indent nested values by two spaces.
    ///
    /// Pretty printing only changes whitespace and the separator after a
    /// name (`": "` instead of `":"`); escaping and values are unaffected.
    ///
    /// # Default
    ///
    /// `false`
    pub pretty_print: bool,

    /// Whether structurally serialized records emit their `class` property.
    ///
    /// # Default
    ///
    /// `true`
    pub write_class_name: bool,

    /// How many levels of composite values [`JsonOutput::write`] may open.
    ///
    /// [`JsonOutput::write`]: crate::JsonOutput::write
    ///
    /// # Default
    ///
    /// `10`
    pub max_depth: usize,

    /// Property discovery mode used when writing records.
    ///
    /// # Default
    ///
    /// [`PropertySetting::ByName`]
    pub property_setting: PropertySetting,
}

impl OutputOptions {
    /// Default nesting budget for a single write.
    pub const DEFAULT_MAX_DEPTH: usize = 10;
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            pretty_print: false,
            write_class_name: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            property_setting: PropertySetting::ByName,
        }
    }
}
