//! Property discovery for records read and written structurally.
//!
//! A [`Structure`] lists a record's accessors and fields. From that list it
//! derives, once per [`PropertySetting`], the map of properties the
//! structural coercer walks.
use core::{any::Any, fmt};
use std::{
    borrow::Cow,
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};

use tracing::{debug, trace};

use crate::{
    JsonInput, JsonOutput, PropertySetting,
    coerce::{Coercible, Erased, downcast_ref},
    error::{JsonError, Result},
};

/// The synthetic, read-only property carrying a record's type name.
pub const CLASS_PROPERTY: &str = "class";

type Getter<T> = Arc<dyn Fn(&T, &mut JsonOutput<'_>, usize) -> Result<()> + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, &mut JsonInput<'_>) -> Result<()> + Send + Sync>;

/// One discovered property.
pub struct Property<T> {
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
}

impl<T> Property<T> {
    /// Whether the property is written out.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    /// Whether the property can be populated from JSON.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            getter: self.getter.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Properties by name, in a stable order.
pub type PropertyMap<T> = BTreeMap<String, Property<T>>;

enum Accessor<T> {
    Getter { accessor: &'static str, get: Getter<T> },
    Setter { accessor: &'static str, set: Setter<T> },
    Field { name: &'static str, get: Getter<T>, set: Option<Setter<T>> },
}

/// How a record is constructed and which properties it has.
///
/// Accessor names follow the `getX` / `isX` / `setX` convention; in
/// [`PropertySetting::ByName`] mode they name the property `x`. Fields are
/// named as given and take part in both modes.
///
/// ```
/// use jsonwire::{PropertySetting, Structure};
///
/// #[derive(Default)]
/// struct User {
///     display_name: String,
///     admin: bool,
/// }
///
/// let structure = Structure::new(User::default)
///     .getter("getDisplayName", |u: &User| u.display_name.clone())
///     .setter("setDisplayName", |u: &mut User, v| u.display_name = v)
///     .getter("isAdmin", |u: &User| u.admin);
///
/// let names: Vec<_> = structure.properties(PropertySetting::ByName).keys().cloned().collect();
/// assert_eq!(names, ["admin", "class", "displayName"]);
/// assert!(!structure.properties(PropertySetting::ByName)["admin"].is_writable());
/// ```
pub struct Structure<T> {
    type_name: Cow<'static, str>,
    construct: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    accessors: Vec<Accessor<T>>,
    by_name: OnceLock<PropertyMap<T>>,
    by_field: OnceLock<PropertyMap<T>>,
}

impl<T: Coercible> Structure<T> {
    /// A record built by `construct` and then populated property by
    /// property.
    pub fn new(construct: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_constructor(Some(Arc::new(construct)))
    }

    /// A record that can be written but never read.
    #[must_use]
    pub fn without_constructor() -> Self {
        Self::with_constructor(None)
    }

    fn with_constructor(construct: Option<Arc<dyn Fn() -> T + Send + Sync>>) -> Self {
        Self {
            type_name: Cow::Borrowed(core::any::type_name::<T>()),
            construct,
            accessors: Vec::new(),
            by_name: OnceLock::new(),
            by_field: OnceLock::new(),
        }
    }

    pub(crate) fn with_type_name(mut self, type_name: Cow<'static, str>) -> Self {
        self.type_name = type_name;
        self
    }

    /// Registers a read accessor such as `getName` or `isEnabled`.
    #[must_use]
    pub fn getter<V: Coercible>(mut self, accessor: &'static str, get: impl Fn(&T) -> V + Send + Sync + 'static) -> Self {
        self.accessors.push(Accessor::Getter {
            accessor,
            get: erase_getter(get),
        });
        self
    }

    /// Registers a write accessor such as `setName`.
    #[must_use]
    pub fn setter<V: Coercible>(
        mut self,
        accessor: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.accessors.push(Accessor::Setter {
            accessor,
            set: erase_setter(set),
        });
        self
    }

    /// Registers a field that is both written out and read back.
    #[must_use]
    pub fn field<V: Coercible>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.accessors.push(Accessor::Field {
            name,
            get: erase_getter(get),
            set: Some(erase_setter(set)),
        });
        self
    }

    /// Registers a field that is only written out.
    #[must_use]
    pub fn read_only_field<V: Coercible>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Self {
        self.accessors.push(Accessor::Field {
            name,
            get: erase_getter(get),
            set: None,
        });
        self
    }

    /// The properties discovered in `setting` mode. Computed on first use and
    /// reused afterwards.
    pub fn properties(&self, setting: PropertySetting) -> &PropertyMap<T> {
        let cell = match setting {
            PropertySetting::ByName => &self.by_name,
            PropertySetting::ByField => &self.by_field,
        };
        cell.get_or_init(|| self.discover(setting))
    }

    fn discover(&self, setting: PropertySetting) -> PropertyMap<T> {
        let mut properties = PropertyMap::new();
        for accessor in &self.accessors {
            match (accessor, setting) {
                (Accessor::Getter { accessor, get }, PropertySetting::ByName) => {
                    match property_name(accessor, &["get", "is"]) {
                        Some(name) => entry(&mut properties, name).getter = Some(Arc::clone(get)),
                        None => debug!(type_name = %self.type_name, accessor = *accessor, "ignoring getter with an unconventional name"),
                    }
                }
                (Accessor::Setter { accessor, set }, PropertySetting::ByName) => {
                    match property_name(accessor, &["set"]) {
                        Some(name) => entry(&mut properties, name).setter = Some(Arc::clone(set)),
                        None => debug!(type_name = %self.type_name, accessor = *accessor, "ignoring setter with an unconventional name"),
                    }
                }
                (Accessor::Getter { .. } | Accessor::Setter { .. }, PropertySetting::ByField) => {}
                (Accessor::Field { name, get, set }, _) => {
                    let property = entry(&mut properties, (*name).to_owned());
                    property.getter = Some(Arc::clone(get));
                    property.setter.clone_from(set);
                }
            }
        }
        let type_name = self.type_name.clone();
        properties.insert(
            CLASS_PROPERTY.to_owned(),
            Property {
                getter: Some(Arc::new(move |_: &T, out: &mut JsonOutput<'_>, _: usize| {
                    out.write_str(&type_name).map(drop)
                })),
                setter: None,
            },
        );
        properties
    }
}

impl<T> fmt::Debug for Structure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("type_name", &self.type_name)
            .field("constructible", &self.construct.is_some())
            .field("accessors", &self.accessors.len())
            .finish_non_exhaustive()
    }
}

fn entry<T>(properties: &mut PropertyMap<T>, name: String) -> &mut Property<T> {
    properties.entry(name).or_insert_with(|| Property {
        getter: None,
        setter: None,
    })
}

fn erase_getter<T: 'static, V: Coercible>(get: impl Fn(&T) -> V + Send + Sync + 'static) -> Getter<T> {
    Arc::new(move |target: &T, out: &mut JsonOutput<'_>, depth: usize| out.write_value(&get(target), depth).map(drop))
}

/// A `null` for a type without a null form leaves the property untouched.
fn erase_setter<T: 'static, V: Coercible>(set: impl Fn(&mut T, V) + Send + Sync + 'static) -> Setter<T> {
    Arc::new(move |target: &mut T, input: &mut JsonInput<'_>| {
        if let Some(value) = input.read::<V>()? {
            set(target, value);
        }
        Ok(())
    })
}

/// Derives a property name from an accessor: `getDisplayName` becomes
/// `displayName`, `getURL` stays `URL`.
fn property_name(accessor: &str, prefixes: &[&str]) -> Option<String> {
    let rest = prefixes.iter().find_map(|p| accessor.strip_prefix(p))?;
    let mut chars = rest.chars();
    let first = chars.next().filter(|c| c.is_uppercase())?;
    if chars.next().is_some_and(char::is_uppercase) {
        return Some(rest.to_owned());
    }
    Some(first.to_lowercase().chain(rest[first.len_utf8()..].chars()).collect())
}

/// A [`Structure`] with its record type erased, as stored in descriptors.
pub(crate) trait ErasedStructure: Send + Sync {
    fn can_construct(&self) -> bool;
    fn read(&self, input: &mut JsonInput<'_>) -> Result<Erased>;
    fn write(&self, value: &dyn Any, out: &mut JsonOutput<'_>, depth: usize) -> Result<()>;
}

impl<T: Coercible> ErasedStructure for Structure<T> {
    fn can_construct(&self) -> bool {
        self.construct.is_some()
    }

    fn read(&self, input: &mut JsonInput<'_>) -> Result<Erased> {
        let construct = self
            .construct
            .as_ref()
            .ok_or_else(|| JsonError::resolution(self.type_name.clone(), "no constructor is available"))?;
        let properties = self.properties(input.setting());
        let mut target = construct();
        input.begin_map()?;
        while input.has_next()? {
            let name = input.next_name()?;
            match properties.get(&name).and_then(|p| p.setter.as_ref()) {
                Some(set) => set(&mut target, input)?,
                None => {
                    trace!(type_name = %self.type_name, property = %name, "skipping unknown property");
                    input.skip_value()?;
                }
            }
        }
        input.end_map()?;
        Ok(Box::new(target))
    }

    fn write(&self, value: &dyn Any, out: &mut JsonOutput<'_>, depth: usize) -> Result<()> {
        let target = downcast_ref::<T>(value)?;
        let depth = out.descend(depth)?;
        out.begin_map()?;
        for (name, property) in self.properties(out.property_setting()) {
            let Some(get) = &property.getter else {
                continue;
            };
            if name == CLASS_PROPERTY && !out.writes_class_name() {
                continue;
            }
            out.name(name)?;
            get(target, out, depth)?;
        }
        out.end_map().map(drop)
    }
}
