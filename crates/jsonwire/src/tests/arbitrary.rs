use quickcheck::{Arbitrary, Gen};

use crate::{Map, Number, Value};

impl Arbitrary for Number {
    fn arbitrary(g: &mut Gen) -> Self {
        match usize::arbitrary(g) % 3 {
            0 => Number::from(u64::arbitrary(g)),
            1 => Number::from(i64::arbitrary(g)),
            _ => {
                let mut value = f64::arbitrary(g);
                while !value.is_finite() {
                    value = f64::arbitrary(g);
                }
                Number::from(value)
            }
        }
    }
}

impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        fn gen_val(g: &mut Gen, depth: usize) -> Value {
            let choices = if depth == 0 { 4 } else { 6 };
            match usize::arbitrary(g) % choices {
                0 => Value::Null,
                1 => Value::Bool(bool::arbitrary(g)),
                2 => Value::Number(Number::arbitrary(g)),
                3 => Value::String(String::arbitrary(g)),
                4 => {
                    let len = usize::arbitrary(g) % 3;
                    Value::Array((0..len).map(|_| gen_val(g, depth - 1)).collect())
                }
                _ => {
                    let len = usize::arbitrary(g) % 3;
                    let mut map = Map::new();
                    for _ in 0..len {
                        map.insert(String::arbitrary(g), gen_val(g, depth - 1));
                    }
                    Value::Object(map)
                }
            }
        }

        let depth = usize::arbitrary(g) % 3;
        gen_val(g, depth)
    }
}
