use fleetsync_types::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by the engine. They are never stored among the domain fields.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// A single domain record (vehicle, driver, expense, ...).
///
/// All fleet data flows through this type. The engine reads only `id`,
/// `createdAt` and `updatedAt`; everything else is carried in `data` and
/// merged as an opaque value.
///
/// Deserialization validates the record shape and fails with
/// [`MalformedRecord`] instead of producing a half-valid entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Entity {
    pub id: RecordId,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Why a record could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no usable id")]
    MissingId,

    #[error("record {id} has no valid updatedAt")]
    MissingUpdatedAt { id: String },

    #[error("record {id} was updated before it was created")]
    UpdatedBeforeCreated { id: String },

    #[error("record {id} is missing required field `{field}`")]
    MissingField { id: String, field: String },
}

impl Entity {
    /// Creates an entity, dropping any reserved keys from `data`.
    pub fn new(
        id: RecordId,
        created_at: Timestamp,
        updated_at: Timestamp,
        mut data: Map<String, Value>,
    ) -> Self {
        for key in RESERVED_FIELDS {
            data.remove(key);
        }
        Self {
            id,
            created_at,
            updated_at,
            data,
        }
    }

    /// Reads an entity from raw JSON.
    ///
    /// `id` and `updatedAt` are mandatory. A missing or unreadable
    /// `createdAt` falls back to `updatedAt`.
    pub fn from_json(value: Value) -> Result<Self, MalformedRecord> {
        let Value::Object(mut data) = value else {
            return Err(MalformedRecord::NotAnObject);
        };

        let id = data
            .remove("id")
            .as_ref()
            .and_then(RecordId::from_json)
            .ok_or(MalformedRecord::MissingId)?;

        let updated_at = data
            .remove("updatedAt")
            .as_ref()
            .and_then(Timestamp::from_json)
            .ok_or_else(|| MalformedRecord::MissingUpdatedAt { id: id.to_string() })?;

        let created_at = data
            .remove("createdAt")
            .as_ref()
            .and_then(Timestamp::from_json)
            .unwrap_or(updated_at);

        if updated_at < created_at {
            return Err(MalformedRecord::UpdatedBeforeCreated { id: id.to_string() });
        }

        Ok(Self {
            id,
            created_at,
            updated_at,
            data,
        })
    }

    /// Serializes the entity back to its wire shape.
    pub fn to_json(&self) -> Value {
        let mut object = self.data.clone();
        object.insert("id".into(), self.id.to_json());
        object.insert("createdAt".into(), Value::from(self.created_at.to_iso_string()));
        object.insert("updatedAt".into(), Value::from(self.updated_at.to_iso_string()));
        Value::Object(object)
    }

    /// Checks that every listed domain field is present and not null.
    pub fn ensure_fields(&self, required: &[String]) -> Result<(), MalformedRecord> {
        for field in required {
            if self.data.get(field).is_none_or(Value::is_null) {
                return Err(MalformedRecord::MissingField {
                    id: self.id.to_string(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Reads a foreign-key style reference (e.g. a freight's `driverId`).
    ///
    /// Resolution happens through the record store; entities never embed
    /// each other.
    pub fn reference(&self, field: &str) -> Option<RecordId> {
        self.data.get(field).and_then(RecordId::from_json)
    }

    /// Extract a string value from `data` using a JSON pointer (e.g., "/plate").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value from `data` using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.pointer(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value from `data` using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.pointer(pointer).and_then(|v| v.as_f64())
    }

    fn pointer(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let top = self.data.get(head)?;
        match tail {
            Some(tail) => top.pointer(&format!("/{tail}")),
            None => Some(top),
        }
    }
}

impl TryFrom<Value> for Entity {
    type Error = MalformedRecord;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}
