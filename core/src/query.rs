//! Query-string encoding and decoding with bracketed keys.
//!
//! `a[]=x&a[]=y` and `a[0]=x&a[1]=y` both decode to `{"a": ["x", "y"]}`;
//! `a[k]=v` decodes to `{"a": {"k": "v"}}`. Encoding is the inverse and is
//! used by the HTTP transport to put `parameters` on the URL.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::CallError;

const FORMAT: &str = "query string";

/// Decode a query string into a JSON object. A leading `?` is ignored.
pub fn decode(query: &str) -> Result<Value, CallError> {
    let query = query.trim_start_matches('?');
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query).map_err(|e| CallError::interpretation(FORMAT, e))?;

    let mut decoder = Decoder::default();
    for (key, value) in pairs {
        decoder.insert(&split_key(&key), value);
    }

    let decoded = decoder
        .root
        .into_iter()
        .map(|(k, v)| (k, into_sequences(v)))
        .collect();
    Ok(Value::Object(decoded))
}

/// Encode a JSON value as a query string. A string is taken as already
/// encoded; `null` values are skipped and booleans become `1`/`0`.
pub fn encode(value: &Value) -> Result<String, CallError> {
    let mut pairs = Vec::new();
    match value {
        Value::Null => return Ok(String::new()),
        Value::String(s) => return Ok(s.trim_start_matches('?').to_string()),
        Value::Object(map) => {
            for (key, item) in map {
                flatten(key.clone(), item, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(index.to_string(), item, &mut pairs);
            }
        }
        scalar => {
            return Err(CallError::invalid_request(format!(
                "parameters must be an object, array or string, got {scalar}"
            )))
        }
    }
    serde_urlencoded::to_string(&pairs).map_err(|e| CallError::invalid_request(e.to_string()))
}

/// Bracket segments past this depth are kept as one literal key.
const MAX_DEPTH: usize = 64;

/// `a[b][]` → `["a", "b", ""]`. A key whose brackets do not close is taken
/// literally.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        if segments.len() > MAX_DEPTH {
            segments.push(rest.to_string());
            return segments;
        }
        let Some(close) = inner.find(']') else {
            return vec![key.to_string()];
        };
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return vec![key.to_string()];
    }
    segments
}

/// Builds the decoded tree, remembering the next free `[]` index of every
/// map by its path.
#[derive(Default)]
struct Decoder {
    root: Map<String, Value>,
    next_index: HashMap<Vec<String>, u64>,
}

impl Decoder {
    fn insert(&mut self, segments: &[String], value: String) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut path = Vec::with_capacity(parents.len());
        let mut target = &mut self.root;

        for segment in parents {
            let key = resolve(&mut self.next_index, &path, segment);
            path.push(key.clone());
            let slot = target
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
                self.next_index.retain(|p, _| !p.starts_with(&path));
            }
            let Value::Object(child) = slot else {
                return;
            };
            target = child;
        }

        let key = resolve(&mut self.next_index, &path, last);
        target.insert(key, Value::String(value));
    }
}

/// The key for `segment` in the map at `path`: `""` takes the next free
/// index, integer keys move it past themselves.
fn resolve(next_index: &mut HashMap<Vec<String>, u64>, path: &[String], segment: &str) -> String {
    let next = next_index.entry(path.to_vec()).or_insert(0);
    if segment.is_empty() {
        let index = *next;
        *next += 1;
        return index.to_string();
    }
    if let Ok(index) = segment.parse::<u64>() {
        *next = (*next).max(index.saturating_add(1));
    }
    segment.to_string()
}

/// Objects keyed `"0"`, `"1"`, ... in order become arrays.
fn into_sequences(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let sequential = !map.is_empty()
        && map
            .keys()
            .enumerate()
            .all(|(i, k)| k.parse::<usize>().ok() == Some(i));
    if sequential {
        Value::Array(map.into_iter().map(|(_, v)| into_sequences(v)).collect())
    } else {
        Value::Object(map.into_iter().map(|(k, v)| (k, into_sequences(v))).collect())
    }
}

fn flatten(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((prefix, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((prefix, n.to_string())),
        Value::String(s) => pairs.push((prefix, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{index}]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(format!("{prefix}[{key}]"), item, pairs);
            }
        }
    }
}
