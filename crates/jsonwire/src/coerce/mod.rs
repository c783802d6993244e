//! The type coercion registry.
//!
//! [`TypeCoercer`] maps a Rust type to the function that reads it from a
//! [`JsonInput`] and the one that writes it to a [`JsonOutput`]. Resolution
//! asks caller-supplied [`Coercer`]s first and then the built-in coercers in
//! [`CoercerKind::RESOLUTION_ORDER`]; the first that claims the type wins.
//! Resolved functions are cached per type for the lifetime of the registry.
use core::{any::TypeId, fmt};
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use tracing::debug;

use crate::{
    JsonInput, JsonOutput, TokenKind,
    error::{JsonError, Result},
};

mod builtin;
mod descriptor;
mod impls;
#[cfg(test)]
mod tests;

pub use builtin::CoercerKind;
pub use descriptor::{
    CanonicalShape, Coercible, EnumShape, Erased, ExactShape, Factory, JsonEnum, Kind, MapShape, NumberShape,
    NumberTarget, OptionalShape, ReadFn, Record, RecordShape, SequenceShape, TypeDescriptor, TypeHandle, WriteFn,
    canonical, canonical_with, enumeration, exact, opaque, record,
};
pub(crate) use descriptor::{downcast, downcast_ref};

/// A caller-supplied coercer, consulted before the built-in ones.
///
/// ```
/// use jsonwire::{Coercible, Json, ReadFn, TypeDescriptor, coerce::{self, Coercer}};
///
/// struct Celsius(f64);
///
/// impl Coercible for Celsius {
///     fn descriptor() -> TypeDescriptor {
///         coerce::opaque::<Self>("Celsius")
///     }
/// }
///
/// struct FromFahrenheit;
///
/// impl Coercer for FromFahrenheit {
///     fn claims(&self, ty: &TypeDescriptor) -> bool {
///         ty.name() == "Celsius"
///     }
///
///     fn reader(&self, _: &TypeDescriptor) -> jsonwire::Result<ReadFn> {
///         Ok(ReadFn::new(|input| {
///             let f = input.next_number()?.as_f64();
///             Ok(Celsius((f - 32.0) / 1.8))
///         }))
///     }
/// }
///
/// let json = Json::with_coercers([Box::new(FromFahrenheit) as Box<dyn Coercer>]);
/// let c: Celsius = json.to_type("212")?.unwrap();
/// assert!((c.0 - 100.0).abs() < 1e-9);
/// # Ok::<(), jsonwire::JsonError>(())
/// ```
pub trait Coercer: Send + Sync {
    /// Whether this coercer handles `ty`.
    fn claims(&self, ty: &TypeDescriptor) -> bool;

    /// Builds the read function for a claimed type.
    ///
    /// # Errors
    ///
    /// A resolution error if the type cannot be read after all.
    fn reader(&self, ty: &TypeDescriptor) -> Result<ReadFn>;

    /// Builds the write function for a claimed type. `None` leaves writing
    /// to the built-in coercers.
    ///
    /// # Errors
    ///
    /// A resolution error if the type cannot be written.
    fn writer(&self, ty: &TypeDescriptor) -> Result<Option<WriteFn>> {
        let _ = ty;
        Ok(None)
    }
}

/// A resolved read function together with what `null` reads as.
#[derive(Clone, Debug)]
pub(crate) struct Reader {
    read: ReadFn,
    null: Option<fn() -> Erased>,
}

impl Reader {
    /// Reads one value. `Ok(None)` means `null` was read into a type that
    /// has no null form.
    pub(crate) fn call(&self, input: &mut JsonInput<'_>) -> Result<Option<Erased>> {
        if input.peek()? == TokenKind::Null {
            input.next_null()?;
            return Ok(self.null.map(|null| null()));
        }
        self.read.call(input).map(Some)
    }
}

/// The registry: resolves, caches and runs coercers.
///
/// Safe to share between threads; lookups take a read lock and resolution
/// happens outside of any lock.
pub struct TypeCoercer {
    extra: Vec<Box<dyn Coercer>>,
    readers: RwLock<HashMap<TypeId, Reader>>,
    writers: RwLock<HashMap<TypeId, WriteFn>>,
}

impl Default for TypeCoercer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeCoercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readers = self.readers.read().unwrap_or_else(PoisonError::into_inner).len();
        let writers = self.writers.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("TypeCoercer")
            .field("extra", &self.extra.len())
            .field("readers", &readers)
            .field("writers", &writers)
            .finish()
    }
}

impl TypeCoercer {
    /// A registry with only the built-in coercers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_coercers(Vec::new())
    }

    /// A registry that consults `coercers`, in order, before the built-in
    /// ones.
    pub fn with_coercers(coercers: impl IntoIterator<Item = Box<dyn Coercer>>) -> Self {
        Self {
            extra: coercers.into_iter().collect(),
            readers: RwLock::default(),
            writers: RwLock::default(),
        }
    }

    /// Reads a `T`. `Ok(None)` means `null` was read into a type without a
    /// null form.
    ///
    /// # Errors
    ///
    /// Resolution errors for `T`, and whatever the reader reports.
    pub fn read<T: Coercible>(&self, input: &mut JsonInput<'_>) -> Result<Option<T>> {
        let reader = self.reader(TypeHandle::of::<T>())?;
        reader.call(input)?.map(downcast::<T>).transpose()
    }

    /// Writes `value` with `depth` levels of nesting left.
    ///
    /// # Errors
    ///
    /// Resolution errors for `T`, and whatever the writer reports.
    pub fn write<T: Coercible>(&self, value: &T, out: &mut JsonOutput<'_>, depth: usize) -> Result<()> {
        self.writer(TypeHandle::of::<T>())?.call(value, out, depth)
    }

    pub(crate) fn reader(&self, ty: TypeHandle) -> Result<Reader> {
        if let Some(reader) = self.readers.read().unwrap_or_else(PoisonError::into_inner).get(&ty.id()) {
            return Ok(reader.clone());
        }
        let reader = self.resolve_reader(&ty.descriptor())?;
        let mut readers = self.readers.write().unwrap_or_else(PoisonError::into_inner);
        Ok(readers.entry(ty.id()).or_insert(reader).clone())
    }

    pub(crate) fn writer(&self, ty: TypeHandle) -> Result<WriteFn> {
        if let Some(writer) = self.writers.read().unwrap_or_else(PoisonError::into_inner).get(&ty.id()) {
            return Ok(writer.clone());
        }
        let writer = self.resolve_writer(&ty.descriptor())?;
        let mut writers = self.writers.write().unwrap_or_else(PoisonError::into_inner);
        Ok(writers.entry(ty.id()).or_insert(writer).clone())
    }

    fn resolve_reader(&self, ty: &TypeDescriptor) -> Result<Reader> {
        let null = ty.null();
        if let Some(coercer) = self.extra.iter().find(|c| c.claims(ty)) {
            debug!(type_name = ty.name(), "caller coercer claims type for reading");
            return Ok(Reader {
                read: coercer.reader(ty)?,
                null,
            });
        }
        if let Kind::Optional(shape) = ty.kind() {
            let inner = self.reader(shape.inner)?.read;
            let wrap = shape.wrap;
            return Ok(Reader {
                read: ReadFn::erased(move |input| inner.call(input).and_then(wrap)),
                null,
            });
        }
        let kind = CoercerKind::resolve(ty).ok_or_else(|| unclaimed(ty))?;
        debug!(type_name = ty.name(), coercer = ?kind, "resolved reader");
        Ok(Reader {
            read: kind.reader(ty)?,
            null,
        })
    }

    fn resolve_writer(&self, ty: &TypeDescriptor) -> Result<WriteFn> {
        for coercer in self.extra.iter().filter(|c| c.claims(ty)) {
            if let Some(writer) = coercer.writer(ty)? {
                debug!(type_name = ty.name(), "caller coercer claims type for writing");
                return Ok(writer);
            }
        }
        if let Kind::Optional(shape) = ty.kind() {
            let inner = self.writer(shape.inner)?;
            let inner_ref = shape.inner_ref;
            return Ok(WriteFn::erased(move |value, out, depth| match inner_ref(value)? {
                Some(value) => inner.call(value, out, depth),
                None => out.write_null().map(drop),
            }));
        }
        let kind = CoercerKind::resolve(ty).ok_or_else(|| unclaimed(ty))?;
        debug!(type_name = ty.name(), coercer = ?kind, "resolved writer");
        kind.writer(ty)
    }
}

fn unclaimed(ty: &TypeDescriptor) -> JsonError {
    JsonError::resolution(ty.name(), format!("no coercer claims {:?} types", ty.kind()))
}
