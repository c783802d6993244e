#![no_main]
use std::{cell::RefCell, io::Read};

use arbitrary::Arbitrary;
use jsonwire::{Json, JsonInput, OutputOptions, PropertySetting, Value};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};
use rand::{Rng, RngCore, SeedableRng, rngs::SmallRng};
use serde_json::Map;

const HEADER: usize = 5; // 1 flag byte + 4-byte chunk seed

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

static WS_TABLE: &[&[u8]] = &[
    b" ",
    b"\t",
    b"\n",
    b"\r",
    "\u{a0}".as_bytes(),
    "\u{2003}".as_bytes(),
    "\u{2028}".as_bytes(),
    "\u{3000}".as_bytes(),
];

fn with_rng<F, R>(f: F) -> R
where
    F: FnOnce(&mut SmallRng) -> R,
{
    RNG.with(|cell| f(&mut cell.borrow_mut()))
}

fn mutator(data: &mut [u8], size: usize, max_size: usize, seed: u32) -> usize {
    if size < HEADER || seed.is_multiple_of(10) {
        data[0] = with_rng(|rng| rng.next_u32() as u8 & 0x07);
        data[1..5].copy_from_slice(&with_rng(|rng| rng.next_u32().to_le_bytes()));

        let limit = max_size - HEADER;
        let mut len = HEADER;
        len += append_whitespace(&mut data[len..], limit);
        len += append_value(&mut data[len..], size, max_size - len);
        len += append_whitespace(&mut data[len..], max_size - len);
        len
    } else {
        fuzzer_mutate(data, size, max_size)
    }
}

/// Writes up to eight whitespace characters without exceeding `limit`.
fn append_whitespace(buf: &mut [u8], limit: usize) -> usize {
    with_rng(|rng| {
        if limit == 0 {
            return 0;
        }
        let mut written = 0;
        for _ in 0..rng.random_range(1..=limit.min(8)) {
            let w = WS_TABLE[rng.random_range(0..WS_TABLE.len())];
            if written + w.len() > limit {
                break;
            }
            buf[written..written + w.len()].copy_from_slice(w);
            written += w.len();
        }
        written
    })
}

fn append_value(data: &mut [u8], size: usize, limit: usize) -> usize {
    let value = loop {
        let s = with_rng(|rng| rng.random_range(size / 2..=size * 2).min(limit));
        let bytes: Vec<u8> = with_rng(|rng| (0..s).map(|_| rng.random::<u8>()).collect());
        if let Ok(value) = ArbitraryValue::arbitrary(&mut arbitrary::Unstructured::new(&bytes)) {
            break value;
        }
    };
    let serialized = serde_json::to_vec(&value.0).expect("serializing an arbitrary value");
    let len = serialized.len().min(limit);
    data[..len].copy_from_slice(&serialized[..len]);
    len
}

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    mutator(data, size, max_size, seed)
});

#[derive(Debug)]
struct ArbitraryValue(serde_json::Value);

impl<'a> Arbitrary<'a> for ArbitraryValue {
    fn arbitrary(u: &mut arbitrary::Unstructured<'_>) -> arbitrary::Result<Self> {
        let value = match u.choose_index(21)? {
            0 => serde_json::Value::Null,
            1 => serde_json::Value::Bool(u.arbitrary()?),
            2 => serde_json::Value::from(u.arbitrary::<i64>()?),
            3 => serde_json::Number::from_f64(u.arbitrary()?)
                .map(serde_json::Value::Number)
                .ok_or(arbitrary::Error::IncorrectFormat)?,
            4..=10 => serde_json::Value::String(u.arbitrary()?),
            11..=15 => {
                let elems: Vec<ArbitraryValue> = u.arbitrary()?;
                serde_json::Value::Array(elems.into_iter().map(|v| v.0).collect())
            }
            _ => {
                let m: Vec<(String, ArbitraryValue)> = u.arbitrary()?;
                serde_json::Value::Object(m.into_iter().map(|(k, v)| (k, v.0)).collect::<Map<_, _>>())
            }
        };
        Ok(ArbitraryValue(value))
    }
}

/// Hands out the input a few bytes at a time, splitting UTF-8 sequences.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fn codec(data: &[u8]) {
    if data.len() < HEADER {
        return;
    }
    let flags = data[0];
    let step = u32::from_le_bytes([data[1], data[2], data[3], data[4]]) as usize % 7 + 1;
    let data = &data[HEADER..];

    let json = Json::new().with_options(OutputOptions {
        pretty_print: flags & 1 != 0,
        write_class_name: false,
        // Anything the reader accepts must be writable again.
        max_depth: JsonInput::DEFAULT_MAX_NESTING + 1,
        property_setting: if flags & 2 != 0 {
            PropertySetting::ByField
        } else {
            PropertySetting::ByName
        },
    });

    let parsed = if flags & 4 != 0 {
        let mut input = json.new_reader_input(Trickle { data, step });
        input.read::<Value>().and_then(|v| input.consume_trailing_whitespace().map(|()| v))
    } else {
        match std::str::from_utf8(data) {
            Ok(text) => json.to_type::<Value>(text),
            Err(_) => return,
        }
    };
    let Ok(Some(value)) = parsed else {
        return;
    };

    let text = json.to_json(&value).expect("writing a parsed value");
    let reparsed = json.to_type::<Value>(&text).expect("reading written output");
    assert_eq!(reparsed.as_ref(), Some(&value), "round trip through {text}");
    assert_eq!(json.to_json(&value).expect("writing again"), text);
}

fuzz_target!(|data: &[u8]| codec(data));
