//! Change detection.
//!
//! A fingerprint is a hash of the canonical serialization of a snapshot's
//! collections and tombstones. Equal data always yields the same
//! fingerprint, whatever order the maps were built in, so a sync can be
//! skipped when nothing changed since the last one.

use fleetsync_model::ConsolidatedSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash used for fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    /// 32-bit rolling hash (`h = h * 31 + unit` over UTF-16 code units).
    #[default]
    Rolling32,
    /// SHA-256, for deployments that cannot tolerate 32-bit collisions.
    Sha256,
}

/// A change marker for a snapshot. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes and compares snapshot fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    algorithm: FingerprintAlgorithm,
}

impl ChangeDetector {
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    /// Fingerprints a snapshot's data. `lastUpdate` and `version` are ignored.
    pub fn fingerprint(&self, snapshot: &ConsolidatedSnapshot) -> Fingerprint {
        let content = snapshot.content();
        let mut out = String::new();
        out.push_str("{\"collections\":");
        write_map(&mut out, content.collections.iter());
        out.push_str(",\"tombstones\":");
        write_map(&mut out, content.tombstones.iter());
        out.push('}');
        self.hash(&out)
    }

    /// Fingerprints an arbitrary JSON value.
    pub fn fingerprint_value(&self, value: &Value) -> Fingerprint {
        self.hash(&canonical_json(value))
    }

    /// True unless `previous` is the fingerprint of `snapshot`.
    pub fn has_changed(&self, previous: Option<&Fingerprint>, snapshot: &ConsolidatedSnapshot) -> bool {
        match previous {
            Some(previous) => *previous != self.fingerprint(snapshot),
            None => true,
        }
    }

    fn hash(&self, canonical: &str) -> Fingerprint {
        match self.algorithm {
            FingerprintAlgorithm::Rolling32 => Fingerprint(format!("{:08x}", rolling32(canonical))),
            FingerprintAlgorithm::Sha256 => {
                Fingerprint(hex::encode(Sha256::digest(canonical.as_bytes())))
            }
        }
    }
}

/// The rolling hash used by every client of the snapshot format.
pub fn rolling32(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

/// Serializes JSON with object keys sorted at every level and no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, value);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::String(s) => write_string(out, s),
        other => out.push_str(&other.to_string()),
    }
}

fn write_map<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a Vec<Value>)>) {
    // BTreeMap iteration is already sorted by key.
    out.push('{');
    for (i, (key, items)) in entries.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        out.push('[');
        for (j, item) in items.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            write_value(out, item);
        }
        out.push(']');
    }
    out.push('}');
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&Value::from(s).to_string());
}
