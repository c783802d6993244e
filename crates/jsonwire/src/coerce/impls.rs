//! [`Coercible`] for standard library and common ecosystem types.
use core::hash::Hash;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    path::PathBuf,
};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::{IndexMap, IndexSet};
use url::Url;
use uuid::Uuid;

use super::descriptor::{
    Coercible, Erased, Kind, MapShape, NumberShape, OptionalShape, SequenceShape, TypeDescriptor, canonical,
    canonical_shape, downcast_ref,
};
use crate::{Number, Value, error::JsonError};

impl Coercible for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Boolean)
    }
}

macro_rules! number_coercible {
    ($($t:ty),*) => {$(
        impl Coercible for $t {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::new::<Self>(Kind::Number(NumberShape::of::<Self>()))
            }
        }
    )*};
}

number_coercible!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, Number);

impl Coercible for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::String)
    }
}

impl Coercible for char {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Char)
    }
}

impl<T: Coercible> Coercible for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Optional(OptionalShape::of::<T>())).nullable(|| Box::new(None::<T>))
    }
}

impl Coercible for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new::<Self>(Kind::Dynamic).nullable(|| Box::new(Value::Null))
    }
}

macro_rules! sequence_coercible {
    ($($c:ident $(: $($bound:path),+)?);*) => {$(
        impl<E: Coercible $($(+ $bound)+)?> Coercible for $c<E> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::new::<Self>(Kind::Sequence(SequenceShape::of::<Self, E>()))
            }
        }
    )*};
}

sequence_coercible!(Vec; VecDeque; HashSet: Eq, Hash; BTreeSet: Ord; IndexSet: Eq, Hash);

macro_rules! map_coercible {
    ($($m:ident),*) => {$(
        impl<V: Coercible> Coercible for $m<String, V> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::new::<Self>(Kind::Map(MapShape::of::<Self, V>()))
            }
        }
    )*};
}

map_coercible!(HashMap, BTreeMap, IndexMap);

impl Coercible for Url {
    fn descriptor() -> TypeDescriptor {
        canonical::<Self>()
    }
}

impl Coercible for Uuid {
    fn descriptor() -> TypeDescriptor {
        canonical::<Self>()
    }
}

impl Coercible for PathBuf {
    fn descriptor() -> TypeDescriptor {
        let shape = canonical_shape(
            |s| Ok(Box::new(PathBuf::from(s)) as Erased),
            |v| {
                let path = downcast_ref::<PathBuf>(v)?;
                path.to_str()
                    .map(str::to_owned)
                    .ok_or_else(|| JsonError::structural(format!("{} is not valid unicode", path.display())))
            },
        );
        TypeDescriptor::new::<Self>(Kind::Canonical(shape))
    }
}

/// Instants travel as RFC 3339 strings and may also be read from a number of
/// milliseconds since the Unix epoch.
impl Coercible for DateTime<Utc> {
    fn descriptor() -> TypeDescriptor {
        let shape = canonical_shape(
            |s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|t| Box::new(t.with_timezone(&Utc)) as Erased)
                    .map_err(|e| e.to_string())
            },
            |v| downcast_ref::<DateTime<Utc>>(v).map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        )
        .with_numbers(|n| {
            n.as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|t| Box::new(t) as Erased)
        });
        TypeDescriptor::new::<Self>(Kind::Canonical(shape))
    }
}
