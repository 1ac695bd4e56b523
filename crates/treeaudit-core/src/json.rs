use crate::error::{AppError, AppResult};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Digest;

pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    let mut json_value = serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("json serialize error: {e}")))?;
    sort_json_value(&mut json_value);
    serde_json::to_vec(&json_value)
        .map_err(|e| AppError::internal(format!("json encode error: {e}")))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// sha256 of the canonical (key-sorted) JSON encoding of `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> AppResult<String> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

fn sort_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            let mut new_map = Map::new();
            for key in keys {
                if let Some(mut v) = map.remove(&key) {
                    sort_json_value(&mut v);
                    new_map.insert(key, v);
                }
            }
            *map = new_map;
        }
        Value::Array(items) => {
            for item in items {
                sort_json_value(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Example {
        b: i32,
        a: i32,
        map: HashMap<String, i32>,
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let mut map = HashMap::new();
        map.insert("z".to_string(), 1);
        map.insert("a".to_string(), 2);
        let example = Example { b: 2, a: 1, map };

        let bytes = to_canonical_json_bytes(&example).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.find("\"a\"").unwrap() < s.find("\"b\"").unwrap());
        assert!(s.find("\"a\":2").unwrap() < s.find("\"z\"").unwrap());
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let first = fingerprint(&vec!["a.txt", "b.txt"]).unwrap();
        let second = fingerprint(&vec!["a.txt", "b.txt"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, fingerprint(&vec!["b.txt", "a.txt"]).unwrap());
    }
}
