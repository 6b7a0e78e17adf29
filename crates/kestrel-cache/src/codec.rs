//! Conversion between typed values and the store's string representation.
//!
//! Integers travel as plain decimal text, strings as themselves, and any
//! other `serde` type as JSON through the [`Json`] wrapper. The choice is made
//! by trait impl at compile time.

use kestrel_core::{KestrelError, KestrelResult};
use serde::{de::DeserializeOwned, Serialize};

/// A value that can be written to the store.
pub trait CacheEncode {
    /// Encodes the value. `Ok(None)` means there is nothing to write.
    fn encode(&self) -> KestrelResult<Option<String>>;
}

/// A value that can be read back from the store.
pub trait CacheDecode: Sized {
    /// Decodes a stored string into `Self`.
    fn decode(raw: &str) -> KestrelResult<Self>;
}

/// Marks a `serde` type for JSON storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

macro_rules! decimal_codec {
    ($($ty:ty),*) => {
        $(
            impl CacheEncode for $ty {
                fn encode(&self) -> KestrelResult<Option<String>> {
                    Ok(Some(self.to_string()))
                }
            }

            impl CacheDecode for $ty {
                fn decode(raw: &str) -> KestrelResult<Self> {
                    raw.parse::<$ty>().map_err(|e| {
                        KestrelError::Serialization(format!(
                            "'{}' is not a valid {}: {}",
                            raw,
                            stringify!($ty),
                            e
                        ))
                    })
                }
            }
        )*
    };
}

decimal_codec!(i32, i64);

impl CacheEncode for str {
    fn encode(&self) -> KestrelResult<Option<String>> {
        Ok(Some(self.to_owned()))
    }
}

impl CacheEncode for String {
    fn encode(&self) -> KestrelResult<Option<String>> {
        self.as_str().encode()
    }
}

impl CacheDecode for String {
    fn decode(raw: &str) -> KestrelResult<Self> {
        Ok(raw.to_owned())
    }
}

impl<T: Serialize> CacheEncode for Json<T> {
    fn encode(&self) -> KestrelResult<Option<String>> {
        let json = serde_json::to_string(&self.0)?;
        // A JSON null is a null value, not a payload.
        if json == "null" {
            return Ok(None);
        }
        Ok(Some(json))
    }
}

impl<T: DeserializeOwned> CacheDecode for Json<T> {
    fn decode(raw: &str) -> KestrelResult<Self> {
        Ok(Json(serde_json::from_str(raw)?))
    }
}

impl<T: CacheEncode> CacheEncode for Option<T> {
    fn encode(&self) -> KestrelResult<Option<String>> {
        match self {
            Some(value) => value.encode(),
            None => Ok(None),
        }
    }
}

impl<T: CacheEncode + ?Sized> CacheEncode for &T {
    fn encode(&self) -> KestrelResult<Option<String>> {
        (**self).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Goods {
        id: i64,
        name: String,
        stock: i32,
    }

    #[test]
    fn test_integers_encode_as_decimal() {
        assert_eq!(42i32.encode().unwrap().as_deref(), Some("42"));
        assert_eq!((-7i64).encode().unwrap().as_deref(), Some("-7"));
        assert_eq!(
            i64::MAX.encode().unwrap().as_deref(),
            Some("9223372036854775807")
        );
    }

    #[test]
    fn test_large_i64_is_exact() {
        // 2^63 - 2 is not representable as an f64.
        let value = i64::MAX - 1;
        let encoded = value.encode().unwrap().unwrap();
        assert_eq!(i64::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_non_numeric_decode_is_serialization_error() {
        let err = i64::decode("abc").unwrap_err();
        assert!(matches!(err, KestrelError::Serialization(_)));
        assert!(err.to_string().contains("i64"));

        assert!(i32::decode("3000000000").is_err());
        assert!(i32::decode("1.5").is_err());
    }

    #[test]
    fn test_strings_are_identity() {
        assert_eq!("plain text".encode().unwrap().as_deref(), Some("plain text"));
        assert_eq!(String::decode("{\"not\":\"parsed\"}").unwrap(), "{\"not\":\"parsed\"}");
    }

    #[test]
    fn test_struct_round_trips_through_json() {
        let goods = Goods {
            id: 1,
            name: "phone".to_string(),
            stock: 10,
        };
        let encoded = Json(&goods).encode().unwrap().unwrap();
        assert_eq!(encoded, r#"{"id":1,"name":"phone","stock":10}"#);

        let decoded = Json::<Goods>::decode(&encoded).unwrap().into_inner();
        assert_eq!(decoded, goods);
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = Json::<Goods>::decode("{\"id\":").unwrap_err();
        assert!(matches!(err, KestrelError::Serialization(_)));
    }

    #[test]
    fn test_null_values_encode_as_absent() {
        assert_eq!(None::<i64>.encode().unwrap(), None);
        assert_eq!(Json(None::<Goods>).encode().unwrap(), None);
        assert_eq!(Some(5i32).encode().unwrap().as_deref(), Some("5"));
    }
}
