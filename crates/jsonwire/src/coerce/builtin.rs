//! The built-in coercers and the order in which they are consulted.
use std::sync::Arc;

use super::descriptor::{
    CanonicalShape, EnumShape, ExactShape, Kind, MapShape, NumberShape, RecordShape, ReadFn, SequenceShape,
    TypeDescriptor, WriteFn,
};
use crate::{
    JsonInput, JsonOutput, Map, Number, TokenKind, Value,
    error::{JsonError, Result},
};

/// The built-in coercers. Each claims one family of types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoercerKind {
    Boolean,
    /// Every numeric width plus [`Number`].
    Number,
    /// `String` and `char`.
    String,
    Enum,
    /// Value types with a canonical string form.
    Canonical,
    /// Domain types that travel as a plain map.
    Exact,
    Sequence,
    Map,
    /// The dynamic [`Value`].
    Dynamic,
    /// Records with a registered factory.
    Factory,
    /// Every other record, read and written through its properties.
    Structural,
}

impl CoercerKind {
    /// The order in which built-in coercers are asked to claim a type; the
    /// first claim wins.
    pub const RESOLUTION_ORDER: [Self; 11] = [
        Self::Boolean,
        Self::Number,
        Self::String,
        Self::Enum,
        Self::Canonical,
        Self::Exact,
        Self::Sequence,
        Self::Map,
        Self::Dynamic,
        Self::Factory,
        Self::Structural,
    ];

    /// Whether this coercer handles `ty`.
    #[must_use]
    pub fn claims(self, ty: &TypeDescriptor) -> bool {
        match (self, ty.kind()) {
            (Self::Boolean, Kind::Boolean)
            | (Self::Number, Kind::Number(_))
            | (Self::String, Kind::String | Kind::Char)
            | (Self::Enum, Kind::Enum(_))
            | (Self::Canonical, Kind::Canonical(_))
            | (Self::Exact, Kind::Exact(_))
            | (Self::Sequence, Kind::Sequence(_))
            | (Self::Map, Kind::Map(_))
            | (Self::Dynamic, Kind::Dynamic)
            | (Self::Structural, Kind::Record(_)) => true,
            (Self::Factory, Kind::Record(record)) => !record.factories.is_empty(),
            _ => false,
        }
    }

    /// The first built-in coercer that claims `ty`.
    #[must_use]
    pub fn resolve(ty: &TypeDescriptor) -> Option<Self> {
        Self::RESOLUTION_ORDER.into_iter().find(|kind| kind.claims(ty))
    }

    /// Builds the read function for `ty`.
    ///
    /// # Errors
    ///
    /// A resolution error if this coercer does not claim `ty` or the type
    /// cannot be constructed from JSON.
    pub fn reader(self, ty: &TypeDescriptor) -> Result<ReadFn> {
        let name = ty.name().to_owned();
        match (self, ty.kind()) {
            (Self::Boolean, Kind::Boolean) => Ok(ReadFn::new(|input| input.next_bool())),
            (Self::Number, Kind::Number(shape)) => Ok(number_reader(*shape, name)),
            (Self::String, Kind::String) => Ok(ReadFn::new(read_string)),
            (Self::String, Kind::Char) => Ok(ReadFn::new(read_char)),
            (Self::Enum, Kind::Enum(shape)) => Ok(enum_reader(*shape, name)),
            (Self::Canonical, Kind::Canonical(shape)) => Ok(canonical_reader(shape.clone(), name)),
            (Self::Exact, Kind::Exact(shape)) => Ok(exact_reader(shape.clone())),
            (Self::Sequence, Kind::Sequence(shape)) => Ok(sequence_reader(*shape)),
            (Self::Map, Kind::Map(shape)) => Ok(map_reader(*shape)),
            (Self::Dynamic, Kind::Dynamic) => Ok(ReadFn::new(read_dynamic)),
            (Self::Factory, Kind::Record(record)) => match record.factories.as_slice() {
                [factory] => Ok(factory.clone()),
                [] => Err(JsonError::resolution(name, "no factory is registered")),
                many => Err(JsonError::resolution(
                    name,
                    format!("{} factories are registered and the choice is ambiguous", many.len()),
                )),
            },
            (Self::Structural, Kind::Record(record)) => match &record.structure {
                Some(structure) if structure.can_construct() => {
                    let structure = Arc::clone(structure);
                    Ok(ReadFn::erased(move |input| structure.read(input)))
                }
                _ => Err(JsonError::resolution(name, "no constructor is available")),
            },
            _ => Err(JsonError::resolution(name, format!("not claimed by the {self:?} coercer"))),
        }
    }

    /// Builds the write function for `ty`.
    ///
    /// # Errors
    ///
    /// A resolution error if this coercer does not claim `ty` or a record
    /// has no way to be written.
    pub fn writer(self, ty: &TypeDescriptor) -> Result<WriteFn> {
        let name = ty.name().to_owned();
        match (self, ty.kind()) {
            (Self::Boolean, Kind::Boolean) => Ok(WriteFn::new::<bool>(|b, out, _| out.write_bool(*b).map(drop))),
            (Self::Number, Kind::Number(shape)) => {
                let to_number = shape.to_number;
                Ok(WriteFn::erased(move |v, out, _| out.write_number(to_number(v)?).map(drop)))
            }
            (Self::String, Kind::String) => Ok(WriteFn::new::<String>(|s, out, _| out.write_str(s).map(drop))),
            (Self::String, Kind::Char) => Ok(WriteFn::new::<char>(|c, out, _| {
                out.write_str(c.encode_utf8(&mut [0; 4])).map(drop)
            })),
            (Self::Enum, Kind::Enum(shape)) => {
                let variant = shape.name;
                Ok(WriteFn::erased(move |v, out, _| out.write_str(variant(v)?).map(drop)))
            }
            (Self::Canonical, Kind::Canonical(shape)) => {
                let render = Arc::clone(&shape.render);
                Ok(WriteFn::erased(move |v, out, _| out.write_str(&render(v)?).map(drop)))
            }
            (Self::Exact, Kind::Exact(shape)) => {
                let to_map = Arc::clone(&shape.to_map);
                Ok(WriteFn::erased(move |v, out, depth| write_map(&to_map(v)?, out, depth)))
            }
            (Self::Sequence, Kind::Sequence(shape)) => Ok(sequence_writer(*shape)),
            (Self::Map, Kind::Map(shape)) => Ok(map_writer(*shape)),
            (Self::Dynamic, Kind::Dynamic) => Ok(WriteFn::new::<Value>(write_dynamic)),
            (Self::Factory | Self::Structural, Kind::Record(record)) => record_writer(record, name),
            _ => Err(JsonError::resolution(name, format!("not claimed by the {self:?} coercer"))),
        }
    }
}

fn mismatch(input: &JsonInput<'_>, expected: &str, actual: TokenKind) -> JsonError {
    input.structural_error(format!("expected {expected} but was {actual}"))
}

fn number_reader(shape: NumberShape, name: String) -> ReadFn {
    ReadFn::erased(move |input| {
        let n = match input.peek()? {
            TokenKind::Number => input.next_number()?,
            TokenKind::String => {
                let s = input.next_string()?;
                s.trim()
                    .parse::<Number>()
                    .map_err(|e| input.structural_error(e.to_string()))?
            }
            actual => return Err(mismatch(input, "a number", actual)),
        };
        (shape.from_number)(n).ok_or_else(|| input.structural_error(format!("{n} is out of range for {name}")))
    })
}

fn read_string(input: &mut JsonInput<'_>) -> Result<String> {
    match input.peek()? {
        TokenKind::String => input.next_string(),
        TokenKind::Name => input.next_name(),
        TokenKind::Number => Ok(input.next_number()?.to_string()),
        TokenKind::Boolean => Ok(input.next_bool()?.to_string()),
        actual => Err(mismatch(input, "a string", actual)),
    }
}

fn read_char(input: &mut JsonInput<'_>) -> Result<char> {
    let s = read_string(input)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(input.structural_error(format!("expected a single character but was '{s}'"))),
    }
}

fn enum_reader(shape: EnumShape, name: String) -> ReadFn {
    ReadFn::erased(move |input| {
        let s = read_string(input)?;
        (shape.parse)(&s).ok_or_else(|| input.structural_error(format!("'{s}' is not a variant of {name}")))
    })
}

fn canonical_reader(shape: CanonicalShape, name: String) -> ReadFn {
    ReadFn::erased(move |input| match (input.peek()?, shape.from_number) {
        (TokenKind::Number, Some(from_number)) => {
            let n = input.next_number()?;
            from_number(n).ok_or_else(|| input.structural_error(format!("{n} is not a valid {name}")))
        }
        (TokenKind::String, _) => {
            let s = input.next_string()?;
            (shape.parse)(&s).map_err(|e| input.structural_error(format!("'{s}' is not a valid {name}: {e}")))
        }
        (actual, _) => Err(mismatch(input, "a string", actual)),
    })
}

fn exact_reader(shape: ExactShape) -> ReadFn {
    ReadFn::erased(move |input| {
        let map = read_required::<Map>(input)?;
        (shape.from_map)(map)
    })
}

/// Reads a `T` that must be present.
fn read_required<T: super::Coercible>(input: &mut JsonInput<'_>) -> Result<T> {
    input
        .read::<T>()?
        .ok_or_else(|| input.structural_error(format!("expected {}", core::any::type_name::<T>())))
}

fn sequence_reader(shape: SequenceShape) -> ReadFn {
    ReadFn::erased(move |input| {
        let element = input.coercer().reader(shape.element)?;
        input.begin_array()?;
        let mut items = Vec::new();
        while input.has_next()? {
            match element.call(input)? {
                Some(item) => items.push(item),
                None => {
                    let name = shape.element.descriptor().name().to_owned();
                    return Err(input.structural_error(format!("null is not a valid {name}")));
                }
            }
        }
        input.end_array()?;
        (shape.collect)(items)
    })
}

fn map_reader(shape: MapShape) -> ReadFn {
    ReadFn::erased(move |input| {
        let value = input.coercer().reader(shape.value)?;
        input.begin_map()?;
        let mut entries = Vec::new();
        while input.has_next()? {
            let key = input.next_name()?;
            match value.call(input)? {
                Some(v) => entries.push((key, v)),
                None => {
                    let name = shape.value.descriptor().name().to_owned();
                    return Err(input.structural_error(format!("null is not a valid {name} for key '{key}'")));
                }
            }
        }
        input.end_map()?;
        (shape.collect)(entries)
    })
}

fn read_dynamic(input: &mut JsonInput<'_>) -> Result<Value> {
    Ok(match input.peek()? {
        TokenKind::Null => {
            input.next_null()?;
            Value::Null
        }
        TokenKind::Boolean => Value::Bool(read_required(input)?),
        TokenKind::String | TokenKind::Name => Value::String(read_required(input)?),
        TokenKind::Number => Value::Number(read_required(input)?),
        TokenKind::StartArray => Value::Array(read_required(input)?),
        TokenKind::StartMap => Value::Object(read_required(input)?),
        actual @ (TokenKind::EndArray | TokenKind::EndMap | TokenKind::End) => {
            return Err(mismatch(input, "a value", actual));
        }
    })
}

fn sequence_writer(shape: SequenceShape) -> WriteFn {
    WriteFn::erased(move |value, out, depth| {
        let depth = out.descend(depth)?;
        let element = out.coercer().writer(shape.element)?;
        out.begin_array()?;
        (shape.for_each)(value, &mut |item| element.call(item, out, depth))?;
        out.end_array().map(drop)
    })
}

fn map_writer(shape: MapShape) -> WriteFn {
    WriteFn::erased(move |value, out, depth| {
        let depth = out.descend(depth)?;
        let writer = out.coercer().writer(shape.value)?;
        out.begin_map()?;
        (shape.for_each)(value, &mut |key, v| {
            out.name(key)?;
            writer.call(v, out, depth)
        })?;
        out.end_map().map(drop)
    })
}

fn write_map(map: &Map, out: &mut JsonOutput<'_>, depth: usize) -> Result<()> {
    let depth = out.descend(depth)?;
    out.begin_map()?;
    for (key, value) in map {
        out.name(key)?;
        write_dynamic(value, out, depth)?;
    }
    out.end_map().map(drop)
}

fn write_dynamic(value: &Value, out: &mut JsonOutput<'_>, depth: usize) -> Result<()> {
    match value {
        Value::Null => out.write_null().map(drop),
        Value::Bool(b) => out.write_bool(*b).map(drop),
        Value::Number(n) => out.write_number(*n).map(drop),
        Value::String(s) => out.write_str(s).map(drop),
        Value::Array(items) => {
            let depth = out.descend(depth)?;
            out.begin_array()?;
            for item in items {
                write_dynamic(item, out, depth)?;
            }
            out.end_array().map(drop)
        }
        Value::Object(map) => write_map(map, out, depth),
    }
}

fn record_writer(record: &RecordShape, name: String) -> Result<WriteFn> {
    if let Some(to_json) = &record.to_json {
        return Ok(to_json.clone());
    }
    match &record.structure {
        Some(structure) => {
            let structure = Arc::clone(structure);
            Ok(WriteFn::erased(move |value, out, depth| structure.write(value, out, depth)))
        }
        None => Err(JsonError::resolution(name, "has neither properties nor a conversion to write")),
    }
}
