//! Writer for small IPv4 MaxMind DB files used as test fixtures.
//!
//! Produces the binary layout `maxminddb` reads: a search tree with 24-bit
//! records, the 16-byte data separator, the data section, then the metadata
//! marker and metadata map. Networks must not overlap.

use std::path::Path;

const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";
const DATA_SEPARATOR: [u8; 16] = [0; 16];

/// A value in the MaxMind DB data section.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    U16(u16),
    U32(u32),
    U64(u64),
    F64(f64),
    Map(Vec<(String, Value)>),
    Array(Vec<Value>),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(s.to_string())
    }

    pub fn map<const N: usize>(pairs: [(&str, Value); N]) -> Self {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::Str(s) => {
                control(out, 2, s.len());
                out.extend_from_slice(s.as_bytes());
            }
            Value::F64(v) => {
                control(out, 3, 8);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::U16(v) => unsigned(out, 5, u64::from(*v)),
            Value::U32(v) => unsigned(out, 6, u64::from(*v)),
            Value::U64(v) => unsigned(out, 9, *v),
            Value::Map(pairs) => {
                control(out, 7, pairs.len());
                for (key, value) in pairs {
                    Value::Str(key.clone()).encode(out);
                    value.encode(out);
                }
            }
            Value::Array(items) => {
                control(out, 11, items.len());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }
}

/// Control byte (plus extended type byte and size bytes).
fn control(out: &mut Vec<u8>, type_num: u8, size: usize) {
    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, Vec::new())
    } else if size < 285 {
        (29, vec![(size - 29) as u8])
    } else if size < 65_821 {
        let v = size - 285;
        (30, vec![(v >> 8) as u8, v as u8])
    } else {
        let v = size - 65_821;
        (31, vec![(v >> 16) as u8, (v >> 8) as u8, v as u8])
    };

    if type_num <= 7 {
        out.push((type_num << 5) | size_bits);
    } else {
        out.push(size_bits);
        out.push(type_num - 7);
    }
    out.extend_from_slice(&extra);
}

/// Unsigned integers are stored big-endian without leading zero bytes.
fn unsigned(out: &mut Vec<u8>, type_num: u8, v: u64) {
    let bytes = v.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    control(out, type_num, bytes.len() - skip);
    out.extend_from_slice(&bytes[skip..]);
}

#[derive(Debug, Clone, Copy)]
enum Record {
    Empty,
    Node(usize),
    Data(usize),
}

/// Serialize a database mapping each `(network, prefix_len)` to its value.
pub fn build(database_type: &str, build_epoch: u64, networks: &[([u8; 4], u8, Value)]) -> Vec<u8> {
    let mut nodes: Vec<[Record; 2]> = vec![[Record::Empty; 2]];
    let mut data = Vec::new();

    for (network, prefix_len, value) in networks {
        assert!((1..=32).contains(prefix_len), "prefix length out of range");
        let offset = data.len();
        value.encode(&mut data);

        let bits = u32::from_be_bytes(*network);
        let mut node = 0;
        for depth in 0..*prefix_len {
            let bit = ((bits >> (31 - depth)) & 1) as usize;
            if depth + 1 == *prefix_len {
                nodes[node][bit] = Record::Data(offset);
                break;
            }
            node = match nodes[node][bit] {
                Record::Node(next) => next,
                _ => {
                    nodes.push([Record::Empty; 2]);
                    let next = nodes.len() - 1;
                    nodes[node][bit] = Record::Node(next);
                    next
                }
            };
        }
    }

    let node_count = nodes.len();
    let mut buf = Vec::new();
    for pair in &nodes {
        for record in pair {
            let value = match *record {
                Record::Empty => node_count,
                Record::Node(next) => next,
                Record::Data(offset) => node_count + DATA_SEPARATOR.len() + offset,
            };
            buf.extend_from_slice(&(value as u32).to_be_bytes()[1..]);
        }
    }
    buf.extend_from_slice(&DATA_SEPARATOR);
    buf.extend_from_slice(&data);
    buf.extend_from_slice(METADATA_MARKER);

    Value::map([
        ("binary_format_major_version", Value::U16(2)),
        ("binary_format_minor_version", Value::U16(0)),
        ("build_epoch", Value::U64(build_epoch)),
        ("database_type", Value::string(database_type)),
        ("description", Value::map([("en", Value::string("test fixture"))])),
        ("ip_version", Value::U16(4)),
        ("languages", Value::Array(vec![Value::string("en")])),
        ("node_count", Value::U32(node_count as u32)),
        ("record_size", Value::U16(24)),
    ])
    .encode(&mut buf);

    buf
}

/// [`build`] and write the result to `path`.
pub fn write(path: &Path, database_type: &str, build_epoch: u64, networks: &[([u8; 4], u8, Value)]) {
    std::fs::write(path, build(database_type, build_epoch, networks)).unwrap();
}
