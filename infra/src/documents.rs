use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{Entity, Id};

/// Backend bookkeeping carried by every record. Unsaved records have no id;
/// the backend assigns one on create.
#[derive(Serialize, Deserialize)]
#[serde(bound = "T: Entity")]
pub struct DocMeta<T> {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id<T>>,
}

pub trait HasMeta: Sized {
    fn meta(&self) -> &DocMeta<Self>;
    fn meta_mut(&mut self) -> &mut DocMeta<Self>;

    fn id(&self) -> Option<&Id<Self>> {
        self.meta().id.as_ref()
    }
}

impl<T> Default for DocMeta<T> {
    fn default() -> Self {
        DocMeta { id: None }
    }
}

impl<T> Clone for DocMeta<T> {
    fn clone(&self) -> Self {
        DocMeta {
            id: self.id.clone(),
        }
    }
}

impl<T> PartialEq for DocMeta<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Entity> fmt::Debug for DocMeta<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DocMeta").field("id", &self.id).finish()
    }
}

impl<T> DocMeta<T> {
    pub fn new_with_id(id: Id<T>) -> Self {
        DocMeta { id: Some(id) }
    }
}

/// Implements `Entity` and `HasMeta` for a record with a `meta` field.
#[macro_export]
macro_rules! entity {
    ($ty: ty, $prefix: expr) => {
        impl $crate::ids::Entity for $ty {
            const PREFIX: &'static str = $prefix;
        }

        impl $crate::documents::HasMeta for $ty {
            fn meta(&self) -> &$crate::documents::DocMeta<Self> {
                &self.meta
            }
            fn meta_mut(&mut self) -> &mut $crate::documents::DocMeta<Self> {
                &mut self.meta
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        #[serde(flatten)]
        meta: DocMeta<Note>,
        body: String,
    }

    entity!(Note, "notes");

    #[test]
    fn unsaved_records_omit_the_id() {
        let note = Note {
            meta: DocMeta::default(),
            body: "hello".into(),
        };
        let json = serde_json::to_value(&note).expect("to_value");
        assert_eq!(json, serde_json::json!({ "body": "hello" }));
    }

    #[test]
    fn saved_records_read_the_backend_id() {
        let note: Note =
            serde_json::from_str(r#"{"_id": "n-1", "body": "hi"}"#).expect("from_str");
        assert_eq!(note.id().map(|id| id.as_str()), Some("n-1"));
    }
}
