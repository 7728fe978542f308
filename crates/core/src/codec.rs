//! JSON byte codec shared by the cache layer and the key/value adapter.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a value as JSON bytes.
pub fn encode<T>(value: &T) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(value).map_err(CodecError::Encode)
}

/// Decode JSON bytes into `T`.
pub fn decode<T>(bytes: &[u8]) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

/// Indented JSON for log output. Returns an empty string if `value` cannot be encoded.
pub fn to_pretty_json<T>(value: &T) -> String
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: i64,
        name: String,
        tags: Vec<String>,
        attributes: BTreeMap<String, bool>,
    }

    #[test]
    fn decode_rejects_malformed_bytes() {
        let err = decode::<Item>(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn decode_rejects_shape_mismatch() {
        let bytes = encode(&vec![1, 2, 3]).unwrap();
        assert!(decode::<Item>(&bytes).is_err());
    }

    #[test]
    fn pretty_json_is_indented() {
        let out = to_pretty_json(&serde_json::json!({ "a": 1 }));
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }

    proptest! {
        /// Property: decode(encode(v)) == v for arbitrary records.
        #[test]
        fn round_trip_preserves_value(
            id in any::<i64>(),
            name in ".*",
            tags in prop::collection::vec("[a-z]{0,8}", 0..5),
            attributes in prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 0..5),
        ) {
            let item = Item { id, name, tags, attributes };
            let bytes = encode(&item).unwrap();
            let back: Item = decode(&bytes).unwrap();
            prop_assert_eq!(back, item);
        }
    }
}
