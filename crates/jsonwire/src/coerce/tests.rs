use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::{DateTime, TimeZone, Utc};
use indexmap::{IndexMap, IndexSet};
use rstest::rstest;
use url::Url;
use uuid::Uuid;

use super::*;
use crate::{Capabilities, Json, Map, Number, Structure, Value};

fn kind_of<T: Coercible>() -> Option<CoercerKind> {
    CoercerKind::resolve(&T::descriptor())
}

fn read<T: Coercible>(text: &str) -> Result<Option<T>> {
    Json::new().to_type(text)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    Red,
    Green,
}

impl JsonEnum for Color {
    fn variants() -> &'static [Self] {
        &[Color::Red, Color::Green]
    }

    fn name(self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Green => "GREEN",
        }
    }
}

impl Coercible for Color {
    fn descriptor() -> TypeDescriptor {
        enumeration::<Self>()
    }
}

#[derive(Debug, PartialEq)]
struct Wrapped(String);

impl Coercible for Wrapped {
    fn descriptor() -> TypeDescriptor {
        record::<Self>("Wrapped")
            .factory(Factory::from_value(|s: String| Ok(Wrapped(s.to_uppercase()))))
            .structure(Structure::new(|| Wrapped(String::new())).field(
                "inner",
                |w: &Wrapped| w.0.clone(),
                |w: &mut Wrapped, v| w.0 = v,
            ))
            .build()
    }
}

#[derive(Debug)]
struct Ambiguous;

impl Coercible for Ambiguous {
    fn descriptor() -> TypeDescriptor {
        record::<Self>("Ambiguous")
            .factory(Factory::from_value(|_: String| Ok(Ambiguous)))
            .factory(Factory::from_value(|_: i64| Ok(Ambiguous)))
            .build()
    }
}

#[derive(Default)]
struct Plain {
    n: i32,
}

impl Coercible for Plain {
    fn descriptor() -> TypeDescriptor {
        record::<Self>("Plain")
            .structure(Structure::new(Plain::default).field("n", |p: &Plain| p.n, |p: &mut Plain, v| p.n = v))
            .build()
    }
}

struct Unreadable;

impl Coercible for Unreadable {
    fn descriptor() -> TypeDescriptor {
        record::<Self>("Unreadable")
            .structure(Structure::without_constructor().read_only_field("x", |_: &Unreadable| 1))
            .build()
    }
}

struct Secret;

impl Coercible for Secret {
    fn descriptor() -> TypeDescriptor {
        opaque::<Self>("Secret")
    }
}

#[rstest]
#[case(kind_of::<bool>(), CoercerKind::Boolean)]
#[case(kind_of::<u8>(), CoercerKind::Number)]
#[case(kind_of::<f32>(), CoercerKind::Number)]
#[case(kind_of::<Number>(), CoercerKind::Number)]
#[case(kind_of::<String>(), CoercerKind::String)]
#[case(kind_of::<char>(), CoercerKind::String)]
#[case(kind_of::<Color>(), CoercerKind::Enum)]
#[case(kind_of::<Url>(), CoercerKind::Canonical)]
#[case(kind_of::<Uuid>(), CoercerKind::Canonical)]
#[case(kind_of::<DateTime<Utc>>(), CoercerKind::Canonical)]
#[case(kind_of::<PathBuf>(), CoercerKind::Canonical)]
#[case(kind_of::<Capabilities>(), CoercerKind::Exact)]
#[case(kind_of::<Vec<u8>>(), CoercerKind::Sequence)]
#[case(kind_of::<BTreeSet<String>>(), CoercerKind::Sequence)]
#[case(kind_of::<IndexMap<String, Value>>(), CoercerKind::Map)]
#[case(kind_of::<Value>(), CoercerKind::Dynamic)]
#[case(kind_of::<Wrapped>(), CoercerKind::Factory)]
#[case(kind_of::<Plain>(), CoercerKind::Structural)]
fn resolves_in_order(#[case] resolved: Option<CoercerKind>, #[case] expected: CoercerKind) {
    assert_eq!(resolved, Some(expected));
}

#[test]
fn resolution_order_is_fixed() {
    assert_eq!(
        CoercerKind::RESOLUTION_ORDER,
        [
            CoercerKind::Boolean,
            CoercerKind::Number,
            CoercerKind::String,
            CoercerKind::Enum,
            CoercerKind::Canonical,
            CoercerKind::Exact,
            CoercerKind::Sequence,
            CoercerKind::Map,
            CoercerKind::Dynamic,
            CoercerKind::Factory,
            CoercerKind::Structural,
        ]
    );
}

#[test]
fn factory_wins_over_structure() {
    assert_eq!(read::<Wrapped>(r#""abc""#).unwrap(), Some(Wrapped("ABC".into())));
    assert_eq!(Json::new().to_json(&Wrapped("x".into())).unwrap(), r#"{"inner":"x"}"#);
}

#[test]
fn ambiguous_factories_fail_to_resolve() {
    let err = read::<Ambiguous>(r#""x""#).unwrap_err();
    assert!(matches!(err, JsonError::Resolution { ref type_name, .. } if type_name == "Ambiguous"), "{err}");
}

#[test]
fn records_without_constructor_cannot_be_read() {
    assert!(matches!(read::<Unreadable>("{}"), Err(JsonError::Resolution { .. })));
    assert_eq!(Json::new().to_json(&Unreadable).unwrap(), r#"{"x":1}"#);
}

#[test]
fn opaque_types_need_a_caller_coercer() {
    assert!(matches!(read::<Secret>("1"), Err(JsonError::Resolution { .. })));
}

#[rstest]
#[case("42", 42)]
#[case("\"42\"", 42)]
#[case("\" -7 \"", -7)]
#[case("42.0", 42)]
fn numbers_accept_numeric_strings_and_whole_floats(#[case] text: &str, #[case] expected: i64) {
    assert_eq!(read::<i64>(text).unwrap(), Some(expected));
}

#[rstest]
#[case("42.5")]
#[case("\"forty-two\"")]
#[case("300")]
#[case("-1")]
#[case("true")]
fn numbers_reject_other_input(#[case] text: &str) {
    assert!(matches!(read::<u8>(text), Err(JsonError::Structural { .. })));
}

#[test]
fn numeric_string_keeps_lexical_kind() {
    assert!(read::<Number>("\"42\"").unwrap().unwrap().is_integral());
    assert!(read::<Number>("\"42.0\"").unwrap().unwrap().is_f64());
}

#[test]
fn strings_accept_scalars() {
    assert_eq!(read::<String>("12").unwrap().as_deref(), Some("12"));
    assert_eq!(read::<String>("1.5").unwrap().as_deref(), Some("1.5"));
    assert_eq!(read::<String>("true").unwrap().as_deref(), Some("true"));
    assert!(matches!(read::<String>("[]"), Err(JsonError::Structural { .. })));
}

#[test]
fn chars_need_exactly_one_character() {
    assert_eq!(read::<char>("\"x\"").unwrap(), Some('x'));
    assert!(read::<char>("\"xy\"").is_err());
    assert!(read::<char>("\"\"").is_err());
}

#[test]
fn enums_match_exactly_then_ignoring_case() {
    assert_eq!(read::<Color>("\"GREEN\"").unwrap(), Some(Color::Green));
    assert_eq!(read::<Color>("\"red\"").unwrap(), Some(Color::Red));
    assert!(read::<Color>("\"blue\"").is_err());
    assert_eq!(Json::new().to_json(&Color::Green).unwrap(), "\"GREEN\"");
}

#[test]
fn null_short_circuits_to_the_null_form() {
    assert_eq!(read::<String>("null").unwrap(), None);
    assert_eq!(read::<Option<String>>("null").unwrap(), Some(None));
    assert_eq!(read::<Option<String>>("\"a\"").unwrap(), Some(Some("a".into())));
    assert_eq!(read::<Value>("null").unwrap(), Some(Value::Null));
}

#[test]
fn null_elements_need_a_null_form() {
    assert!(matches!(read::<Vec<i32>>("[1, null]"), Err(JsonError::Structural { .. })));
    assert_eq!(read::<Vec<Option<i32>>>("[1, null]").unwrap(), Some(vec![Some(1), None]));
    assert!(matches!(
        read::<HashMap<String, String>>(r#"{"a": null}"#),
        Err(JsonError::Structural { .. })
    ));
}

#[test]
fn collections() {
    assert_eq!(read::<VecDeque<u8>>("[1,2]").unwrap(), Some(VecDeque::from([1, 2])));
    assert_eq!(read::<HashSet<u8>>("[1,1,2]").unwrap().map(|s| s.len()), Some(2));
    let ordered: IndexSet<String> = read(r#"["b","a","b"]"#).unwrap().unwrap();
    assert_eq!(ordered.iter().collect::<Vec<_>>(), ["b", "a"]);
    let sorted: BTreeMap<String, bool> = read(r#"{"z": true, "a": false}"#).unwrap().unwrap();
    assert_eq!(sorted.keys().collect::<Vec<_>>(), ["a", "z"]);
    let nested: Vec<Vec<i8>> = read("[[1],[],[2,3]]").unwrap().unwrap();
    assert_eq!(nested, vec![vec![1], vec![], vec![2, 3]]);
}

#[test]
fn dynamic_values_redirect_by_token() {
    let v: Value = read(r#"{"a": [true, 1, 2.5, "s", null, {}], 3: "n"}"#).unwrap().unwrap();
    let a = v.get("a").and_then(Value::as_array).unwrap();
    assert_eq!(a[0], Value::Bool(true));
    assert!(a[1].as_number().unwrap().is_integral());
    assert!(a[2].as_number().unwrap().is_f64());
    assert_eq!(a[3], Value::from("s"));
    assert!(a[4].is_null());
    assert_eq!(a[5], Value::Object(Map::new()));
    assert_eq!(v.get("3"), Some(&Value::from("n")));
}

#[test]
fn canonical_types() {
    let url: Url = read(r#""https://example.com/a?b=c""#).unwrap().unwrap();
    assert_eq!(url.host_str(), Some("example.com"));
    assert!(matches!(read::<Url>(r#""not a url""#), Err(JsonError::Structural { .. })));

    let id: Uuid = read(r#""67e55044-10b1-426f-9247-bb680e5fe0c8""#).unwrap().unwrap();
    assert_eq!(Json::new().to_json(&id).unwrap(), r#""67e55044-10b1-426f-9247-bb680e5fe0c8""#);

    let at = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
    assert_eq!(read::<DateTime<Utc>>("1709208000000").unwrap(), Some(at));
    assert_eq!(read::<DateTime<Utc>>(r#""2024-02-29T13:00:00+01:00""#).unwrap(), Some(at));
    assert_eq!(Json::new().to_json(&at).unwrap(), r#""2024-02-29T12:00:00Z""#);

    let path: PathBuf = read(r#""dir/file.txt""#).unwrap().unwrap();
    assert_eq!(Json::new().to_json(&path).unwrap(), r#""dir\/file.txt""#);
}

struct Upper;

impl Coercer for Upper {
    fn claims(&self, ty: &TypeDescriptor) -> bool {
        ty.id() == core::any::TypeId::of::<String>()
    }

    fn reader(&self, _: &TypeDescriptor) -> Result<ReadFn> {
        Ok(ReadFn::new(|input| Ok(input.next_string()?.to_uppercase())))
    }

    fn writer(&self, _: &TypeDescriptor) -> Result<Option<WriteFn>> {
        Ok(Some(WriteFn::new::<String>(|s, out, _| out.write_str(&s.to_lowercase()).map(drop))))
    }
}

#[test]
fn caller_coercers_take_precedence() {
    let json = Json::with_coercers([Box::new(Upper) as Box<dyn Coercer>]);
    assert_eq!(json.to_type::<String>(r#""abc""#).unwrap().as_deref(), Some("ABC"));
    assert_eq!(json.to_type::<Vec<String>>(r#"["a"]"#).unwrap(), Some(vec!["A".to_owned()]));
    assert_eq!(json.to_type::<Option<String>>("null").unwrap(), Some(None));
    assert_eq!(json.to_json(&"MiXeD".to_owned()).unwrap(), r#""mixed""#);
    assert_eq!(read::<String>(r#""abc""#).unwrap().as_deref(), Some("abc"));
}

struct Counting(Arc<AtomicUsize>);

impl Coercer for Counting {
    fn claims(&self, ty: &TypeDescriptor) -> bool {
        self.0.fetch_add(1, Ordering::SeqCst);
        matches!(ty.kind(), Kind::Opaque)
    }

    fn reader(&self, _: &TypeDescriptor) -> Result<ReadFn> {
        Ok(ReadFn::new(|input| input.next_null().map(|()| Secret)))
    }
}

#[test]
fn resolution_is_cached_per_type() {
    let claims = Arc::new(AtomicUsize::new(0));
    let json = Json::with_coercers([Box::new(Counting(Arc::clone(&claims))) as Box<dyn Coercer>]);
    for _ in 0..3 {
        json.to_type::<bool>("true").unwrap();
    }
    assert_eq!(claims.load(Ordering::SeqCst), 1);
}

#[test]
fn registry_is_shareable_across_threads() {
    let json = Json::new();
    std::thread::scope(|scope| {
        for i in 0..4 {
            let json = json.clone();
            scope.spawn(move || {
                let v: Vec<u32> = json.to_type(&format!("[{i}, {i}]")).unwrap().unwrap();
                assert_eq!(v, [i, i]);
            });
        }
    });
}
