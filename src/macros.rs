#[macro_export]
macro_rules! value {
    // Handle null
    (null) => {
        $crate::Value::Null
    };

    // Handle true
    (true) => {
        $crate::Value::Bool(true)
    };

    // Handle false
    (false) => {
        $crate::Value::Bool(false)
    };

    // Handle empty array
    ([]) => {
        $crate::Value::Array(vec![])
    };

    // Handle non-empty array
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    // Handle empty map
    ({}) => {
        $crate::Value::Map($crate::ValueMap::new())
    };

    // Handle non-empty map
    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut map = $crate::ValueMap::new();
        $(
            map.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::Map(map)
    }};

    // Fallback: anything with a From<_> for Value impl
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Number, Value, ValueMap};

    #[test]
    fn value_macro_primitives() {
        assert_eq!(value!(null), Value::Null);
        assert_eq!(value!(true), Value::Bool(true));
        assert_eq!(value!(false), Value::Bool(false));
        assert_eq!(value!(42), Value::Number(Number::Uint(42)));
        assert_eq!(value!(-7), Value::Number(Number::Int(-7)));
        assert_eq!(value!(3.5), Value::Number(Number::Float(3.5)));
        assert_eq!(value!("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn value_macro_arrays() {
        assert_eq!(value!([]), Value::Array(vec![]));

        let arr = value!([1, 2, 3]);
        match arr {
            Value::Array(vec) => {
                assert_eq!(vec.len(), 3);
                assert_eq!(vec[0], Value::Number(Number::Uint(1)));
                assert_eq!(vec[2], Value::Number(Number::Uint(3)));
            }
            _ => panic!("Expected array"),
        }
    }

    #[test]
    fn value_macro_maps() {
        assert_eq!(value!({}), Value::Map(ValueMap::new()));

        let doc = value!({
            "name": "Alice",
            "age": 30,
            "pets": [null, "cat"]
        });

        match doc {
            Value::Map(map) => {
                assert_eq!(map.len(), 3);
                assert_eq!(map.get("name"), Some(&Value::String("Alice".to_string())));
                assert_eq!(map.get("age"), Some(&Value::Number(Number::Uint(30))));
                assert_eq!(
                    map.get("pets"),
                    Some(&Value::Array(vec![
                        Value::Null,
                        Value::String("cat".to_string())
                    ]))
                );
            }
            _ => panic!("Expected map"),
        }
    }
}
