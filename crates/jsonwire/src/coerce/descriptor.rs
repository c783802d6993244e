//! What the registry knows about a target type.
//!
//! Every type the codec can read or write implements [`Coercible`], which
//! describes the type's family ([`Kind`]) together with the type-specific
//! glue the built-in coercers need: how to collect a sequence, how to turn a
//! [`Number`] into the target width, which constructor builds a record.
use core::{any::Any, fmt, str::FromStr};
use std::{any::TypeId, borrow::Cow, sync::Arc};

use crate::{
    JsonInput, JsonOutput, Map, Number,
    error::{JsonError, Result},
    introspect::{ErasedStructure, Structure},
};

/// A value whose concrete type is only known to the registry.
pub type Erased = Box<dyn Any + Send>;

/// A type the registry can read and write.
///
/// Implementations describe the type once; the registry resolves and caches a
/// reader and a writer per type the first time it sees it.
///
/// # Examples
///
/// ```
/// use jsonwire::{Coercible, Json, Structure, TypeDescriptor, coerce};
///
/// #[derive(Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Coercible for Point {
///     fn descriptor() -> TypeDescriptor {
///         coerce::record::<Self>("Point")
///             .structure(
///                 Structure::new(Point::default)
///                     .field("x", |p: &Point| p.x, |p: &mut Point, v| p.x = v)
///                     .field("y", |p: &Point| p.y, |p: &mut Point, v| p.y = v),
///             )
///             .build()
///     }
/// }
///
/// let json = Json::new();
/// let p: Point = json.to_type(r#"{"x": 1, "y": 2}"#)?.unwrap();
/// assert_eq!((p.x, p.y), (1, 2));
/// assert_eq!(json.to_json(&p)?, r#"{"x":1,"y":2}"#);
/// # Ok::<(), jsonwire::JsonError>(())
/// ```
pub trait Coercible: Any + Send + Sized {
    /// Describes this type to the registry.
    fn descriptor() -> TypeDescriptor;
}

/// A lazily described reference to a type, used for element and property
/// types so recursive types can be described.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    describe: fn() -> TypeDescriptor,
}

impl TypeHandle {
    #[must_use]
    pub fn of<T: Coercible>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            describe: T::descriptor,
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.id).finish()
    }
}

/// The resolved description of a target type.
pub struct TypeDescriptor {
    id: TypeId,
    name: Cow<'static, str>,
    kind: Kind,
    null: Option<fn() -> Erased>,
}

impl TypeDescriptor {
    pub(crate) fn new<T: Coercible>(kind: Kind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: Cow::Borrowed(core::any::type_name::<T>()),
            kind,
            null: None,
        }
    }

    pub(crate) fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the type as having a value that `null` reads as.
    pub(crate) fn nullable(mut self, null: fn() -> Erased) -> Self {
        self.null = Some(null);
        self
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type's name: the record name for records, the Rust type name
    /// otherwise.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Whether `null` reads as a value of this type rather than as absence.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.null.is_some()
    }

    pub(crate) fn null(&self) -> Option<fn() -> Erased> {
        self.null
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.is_nullable())
            .finish_non_exhaustive()
    }
}

/// The family a type belongs to. Each built-in coercer claims one family.
pub enum Kind {
    Boolean,
    Number(NumberShape),
    String,
    Char,
    Enum(EnumShape),
    Canonical(CanonicalShape),
    Exact(ExactShape),
    Sequence(SequenceShape),
    Map(MapShape),
    /// The dynamic [`Value`](crate::Value).
    Dynamic,
    Optional(OptionalShape),
    Record(RecordShape),
    /// Handled only by caller-supplied coercers.
    Opaque,
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "Boolean",
            Self::Number(_) => "Number",
            Self::String => "String",
            Self::Char => "Char",
            Self::Enum(_) => "Enum",
            Self::Canonical(_) => "Canonical",
            Self::Exact(_) => "Exact",
            Self::Sequence(_) => "Sequence",
            Self::Map(_) => "Map",
            Self::Dynamic => "Dynamic",
            Self::Optional(_) => "Optional",
            Self::Record(_) => "Record",
            Self::Opaque => "Opaque",
        })
    }
}

pub(crate) fn downcast<T: Any>(value: Erased) -> Result<T> {
    value.downcast::<T>().map(|b| *b).map_err(|_| mismatch::<T>())
}

pub(crate) fn downcast_ref<T: Any>(value: &dyn Any) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(mismatch::<T>)
}

fn mismatch<T>() -> JsonError {
    JsonError::structural(format!("value is not a {}", core::any::type_name::<T>()))
}

/// Reads one value of a fixed type from a parser. The `null` token never
/// reaches a `ReadFn`; the registry handles it first.
#[derive(Clone)]
pub struct ReadFn(Arc<dyn Fn(&mut JsonInput<'_>) -> Result<Erased> + Send + Sync>);

impl ReadFn {
    /// Wraps a typed read function.
    pub fn new<T: Coercible>(read: impl Fn(&mut JsonInput<'_>) -> Result<T> + Send + Sync + 'static) -> Self {
        Self::erased(move |input| read(input).map(|v| Box::new(v) as Erased))
    }

    pub(crate) fn erased(read: impl Fn(&mut JsonInput<'_>) -> Result<Erased> + Send + Sync + 'static) -> Self {
        Self(Arc::new(read))
    }

    pub(crate) fn call(&self, input: &mut JsonInput<'_>) -> Result<Erased> {
        (self.0)(input)
    }
}

impl fmt::Debug for ReadFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadFn")
    }
}

type ErasedWrite = dyn Fn(&dyn Any, &mut JsonOutput<'_>, usize) -> Result<()> + Send + Sync;

/// Writes one value of a fixed type, given the remaining depth budget.
#[derive(Clone)]
pub struct WriteFn(Arc<ErasedWrite>);

impl WriteFn {
    /// Wraps a typed write function.
    pub fn new<T: Coercible>(
        write: impl Fn(&T, &mut JsonOutput<'_>, usize) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::erased(move |value, out, depth| write(downcast_ref::<T>(value)?, out, depth))
    }

    pub(crate) fn erased(
        write: impl Fn(&dyn Any, &mut JsonOutput<'_>, usize) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(write))
    }

    pub(crate) fn call(&self, value: &dyn Any, out: &mut JsonOutput<'_>, depth: usize) -> Result<()> {
        (self.0)(value, out, depth)
    }
}

impl fmt::Debug for WriteFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WriteFn")
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Numeric types the number coercer converts to and from.
pub trait NumberTarget: sealed::Sealed + Coercible + Copy {
    #[doc(hidden)]
    fn from_number(n: Number) -> Option<Self>;
    #[doc(hidden)]
    fn to_number(self) -> Number;
}

macro_rules! integral_target {
    ($($t:ty),*) => {$(
        impl sealed::Sealed for $t {}
        impl NumberTarget for $t {
            fn from_number(n: Number) -> Option<Self> {
                n.to_i128().and_then(|i| <$t>::try_from(i).ok())
            }
            fn to_number(self) -> Number {
                Number::from(self)
            }
        }
    )*};
}

integral_target!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl sealed::Sealed for f64 {}
impl NumberTarget for f64 {
    fn from_number(n: Number) -> Option<Self> {
        Some(n.as_f64())
    }
    fn to_number(self) -> Number {
        Number::from(self)
    }
}

impl sealed::Sealed for f32 {}
impl NumberTarget for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_number(n: Number) -> Option<Self> {
        let f = n.as_f64() as f32;
        f.is_finite().then_some(f)
    }
    fn to_number(self) -> Number {
        Number::from(self)
    }
}

impl sealed::Sealed for Number {}
impl NumberTarget for Number {
    fn from_number(n: Number) -> Option<Self> {
        Some(n)
    }
    fn to_number(self) -> Number {
        self
    }
}

#[derive(Clone, Copy)]
pub struct NumberShape {
    pub(crate) from_number: fn(Number) -> Option<Erased>,
    pub(crate) to_number: fn(&dyn Any) -> Result<Number>,
}

impl NumberShape {
    pub(crate) fn of<T: NumberTarget>() -> Self {
        Self {
            from_number: |n| T::from_number(n).map(|v| Box::new(v) as Erased),
            to_number: |v| downcast_ref::<T>(v).map(|v| v.to_number()),
        }
    }
}

/// A fieldless enum that travels as the name of its variant.
///
/// ```
/// use jsonwire::{Coercible, Json, JsonEnum, TypeDescriptor, coerce};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Level {
///     Info,
///     Warning,
/// }
///
/// impl JsonEnum for Level {
///     fn variants() -> &'static [Self] {
///         &[Level::Info, Level::Warning]
///     }
///     fn name(self) -> &'static str {
///         match self {
///             Level::Info => "INFO",
///             Level::Warning => "WARNING",
///         }
///     }
/// }
///
/// impl Coercible for Level {
///     fn descriptor() -> TypeDescriptor {
///         coerce::enumeration::<Self>()
///     }
/// }
///
/// let json = Json::new();
/// assert_eq!(json.to_type::<Level>(r#""warning""#)?, Some(Level::Warning));
/// assert_eq!(json.to_json(&Level::Info)?, r#""INFO""#);
/// # Ok::<(), jsonwire::JsonError>(())
/// ```
pub trait JsonEnum: Coercible + Copy {
    /// Every variant, in declaration order.
    fn variants() -> &'static [Self];
    /// The wire name of a variant.
    fn name(self) -> &'static str;
}

#[derive(Clone, Copy)]
pub struct EnumShape {
    pub(crate) parse: fn(&str) -> Option<Erased>,
    pub(crate) name: fn(&dyn Any) -> Result<&'static str>,
}

impl EnumShape {
    fn of<T: JsonEnum>() -> Self {
        Self {
            parse: |s| {
                let variants = T::variants();
                variants
                    .iter()
                    .find(|v| v.name() == s)
                    .or_else(|| variants.iter().find(|v| v.name().eq_ignore_ascii_case(s)))
                    .map(|v| Box::new(*v) as Erased)
            },
            name: |v| downcast_ref::<T>(v).map(|v| v.name()),
        }
    }
}

type Parse = dyn Fn(&str) -> core::result::Result<Erased, String> + Send + Sync;
type Render = dyn Fn(&dyn Any) -> Result<String> + Send + Sync;

/// A value type with a canonical string form, such as a URL.
#[derive(Clone)]
pub struct CanonicalShape {
    pub(crate) parse: Arc<Parse>,
    pub(crate) render: Arc<Render>,
    pub(crate) from_number: Option<fn(Number) -> Option<Erased>>,
}

impl CanonicalShape {
    pub(crate) fn with_numbers(mut self, from_number: fn(Number) -> Option<Erased>) -> Self {
        self.from_number = Some(from_number);
        self
    }
}

type FromMap = dyn Fn(Map) -> Result<Erased> + Send + Sync;
type ToMap = dyn Fn(&dyn Any) -> Result<Map> + Send + Sync;

/// A type that travels as a plain JSON object with a bespoke layout.
#[derive(Clone)]
pub struct ExactShape {
    pub(crate) from_map: Arc<FromMap>,
    pub(crate) to_map: Arc<ToMap>,
}

type ForEachElement = fn(&dyn Any, &mut dyn FnMut(&dyn Any) -> Result<()>) -> Result<()>;
type ForEachEntry = fn(&dyn Any, &mut dyn FnMut(&str, &dyn Any) -> Result<()>) -> Result<()>;

#[derive(Clone, Copy)]
pub struct SequenceShape {
    pub(crate) element: TypeHandle,
    pub(crate) collect: fn(Vec<Erased>) -> Result<Erased>,
    pub(crate) for_each: ForEachElement,
}

impl SequenceShape {
    pub(crate) fn of<C, E>() -> Self
    where
        C: Coercible + FromIterator<E>,
        E: Coercible,
        for<'a> &'a C: IntoIterator<Item = &'a E>,
    {
        Self {
            element: TypeHandle::of::<E>(),
            collect: |items| {
                items
                    .into_iter()
                    .map(downcast::<E>)
                    .collect::<Result<C>>()
                    .map(|c| Box::new(c) as Erased)
            },
            for_each: |value, f| downcast_ref::<C>(value)?.into_iter().try_for_each(|e| f(e as &dyn Any)),
        }
    }
}

#[derive(Clone, Copy)]
pub struct MapShape {
    pub(crate) value: TypeHandle,
    pub(crate) collect: fn(Vec<(String, Erased)>) -> Result<Erased>,
    pub(crate) for_each: ForEachEntry,
}

impl MapShape {
    pub(crate) fn of<M, V>() -> Self
    where
        M: Coercible + FromIterator<(String, V)>,
        V: Coercible,
        for<'a> &'a M: IntoIterator<Item = (&'a String, &'a V)>,
    {
        Self {
            value: TypeHandle::of::<V>(),
            collect: |entries| {
                entries
                    .into_iter()
                    .map(|(k, v)| downcast::<V>(v).map(|v| (k, v)))
                    .collect::<Result<M>>()
                    .map(|m| Box::new(m) as Erased)
            },
            for_each: |value, f| {
                downcast_ref::<M>(value)?
                    .into_iter()
                    .try_for_each(|(k, v)| f(k.as_str(), v as &dyn Any))
            },
        }
    }
}

/// `Option<T>`, read and written through `T`.
#[derive(Clone, Copy)]
pub struct OptionalShape {
    pub(crate) inner: TypeHandle,
    pub(crate) wrap: fn(Erased) -> Result<Erased>,
    pub(crate) inner_ref: fn(&dyn Any) -> Result<Option<&dyn Any>>,
}

impl OptionalShape {
    pub(crate) fn of<T: Coercible>() -> Self {
        Self {
            inner: TypeHandle::of::<T>(),
            wrap: |v| downcast::<T>(v).map(|v| Box::new(Some(v)) as Erased),
            inner_ref: |v| Ok(downcast_ref::<Option<T>>(v)?.as_ref().map(|v| v as &dyn Any)),
        }
    }
}

/// A type with its own properties, built by a factory or structurally.
#[derive(Clone)]
pub struct RecordShape {
    pub(crate) factories: Vec<ReadFn>,
    pub(crate) structure: Option<Arc<dyn ErasedStructure>>,
    pub(crate) to_json: Option<WriteFn>,
}

/// A way to build a `T` from JSON.
pub struct Factory<T> {
    read: ReadFn,
    _marker: core::marker::PhantomData<fn() -> T>,
}

impl<T: Coercible> Factory<T> {
    /// A factory that consumes the raw parser.
    pub fn from_input(read: impl Fn(&mut JsonInput<'_>) -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            read: ReadFn::new(read),
            _marker: core::marker::PhantomData,
        }
    }

    /// A factory that receives a single argument of type `A`, coerced by the
    /// registry first.
    pub fn from_value<A: Coercible>(build: impl Fn(A) -> Result<T> + Send + Sync + 'static) -> Self {
        Self::from_input(move |input| {
            let arg = input.read::<A>()?.ok_or_else(|| {
                JsonError::structural(format!("missing argument for {}", core::any::type_name::<T>()))
            })?;
            build(arg)
        })
    }
}

/// Builder for a record descriptor, returned by [`record`].
pub struct Record<T> {
    name: Cow<'static, str>,
    shape: RecordShape,
    _marker: core::marker::PhantomData<fn() -> T>,
}

impl<T: Coercible> Record<T> {
    /// Adds a factory. A record with more than one factory cannot be read.
    #[must_use]
    pub fn factory(mut self, factory: Factory<T>) -> Self {
        self.shape.factories.push(factory.read);
        self
    }

    /// Describes the record's properties for structural reading and writing.
    #[must_use]
    pub fn structure(mut self, structure: Structure<T>) -> Self {
        let structure = structure.with_type_name(self.name.clone());
        self.shape.structure = Some(Arc::new(structure));
        self
    }

    /// Serializes the record as whatever `convert` returns instead of
    /// through its properties.
    #[must_use]
    pub fn to_json<R: Coercible>(mut self, convert: impl Fn(&T) -> R + Send + Sync + 'static) -> Self {
        self.shape.to_json = Some(WriteFn::new::<T>(move |value, out, depth| {
            out.write_value(&convert(value), depth).map(drop)
        }));
        self
    }

    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::new::<T>(Kind::Record(self.shape)).named(self.name)
    }
}

/// Starts describing a record type called `name`.
pub fn record<T: Coercible>(name: impl Into<Cow<'static, str>>) -> Record<T> {
    Record {
        name: name.into(),
        shape: RecordShape {
            factories: Vec::new(),
            structure: None,
            to_json: None,
        },
        _marker: core::marker::PhantomData,
    }
}

/// Describes a [`JsonEnum`].
#[must_use]
pub fn enumeration<T: JsonEnum>() -> TypeDescriptor {
    TypeDescriptor::new::<T>(Kind::Enum(EnumShape::of::<T>()))
}

/// Describes a type whose canonical form is its [`Display`](fmt::Display)
/// output, read back with [`FromStr`].
#[must_use]
pub fn canonical<T>() -> TypeDescriptor
where
    T: Coercible + FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    canonical_with::<T>(|s| s.parse::<T>().map_err(|e| e.to_string()), ToString::to_string)
}

/// Describes a type with a canonical string form given by `parse` and
/// `render`.
pub fn canonical_with<T: Coercible>(
    parse: impl Fn(&str) -> core::result::Result<T, String> + Send + Sync + 'static,
    render: impl Fn(&T) -> String + Send + Sync + 'static,
) -> TypeDescriptor {
    TypeDescriptor::new::<T>(Kind::Canonical(canonical_shape(
        move |s| parse(s).map(|v| Box::new(v) as Erased),
        move |v| downcast_ref::<T>(v).map(&render),
    )))
}

pub(crate) fn canonical_shape(
    parse: impl Fn(&str) -> core::result::Result<Erased, String> + Send + Sync + 'static,
    render: impl Fn(&dyn Any) -> Result<String> + Send + Sync + 'static,
) -> CanonicalShape {
    CanonicalShape {
        parse: Arc::new(parse),
        render: Arc::new(render),
        from_number: None,
    }
}

/// Describes a type that travels as a plain JSON object.
pub fn exact<T: Coercible>(
    name: impl Into<Cow<'static, str>>,
    from_map: impl Fn(Map) -> Result<T> + Send + Sync + 'static,
    to_map: impl Fn(&T) -> Map + Send + Sync + 'static,
) -> TypeDescriptor {
    let shape = ExactShape {
        from_map: Arc::new(move |map: Map| from_map(map).map(|v| Box::new(v) as Erased)),
        to_map: Arc::new(move |v: &dyn Any| downcast_ref::<T>(v).map(&to_map)),
    };
    TypeDescriptor::new::<T>(Kind::Exact(shape)).named(name)
}

/// Describes a type only caller-supplied coercers know how to handle.
pub fn opaque<T: Coercible>(name: impl Into<Cow<'static, str>>) -> TypeDescriptor {
    TypeDescriptor::new::<T>(Kind::Opaque).named(name)
}
