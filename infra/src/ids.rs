use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use err_derive::Error;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// An identifier assigned by the backend, tagged with the kind of record it
/// refers to so that a restaurant id cannot be handed to a recipe lookup.
pub struct Id<T> {
    val: String,
    phantom: PhantomData<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error(display = "empty identifier")]
    Empty,
    #[error(display = "invalid character {:?} in identifier", _0)]
    InvalidCharacter(char),
}

/// A kind of record held by the backend. `PREFIX` is the collection path
/// segment under which records of this kind live, eg: `ratemasterentry`.
pub trait Entity {
    const PREFIX: &'static str;
}

impl<T> Id<T> {
    pub fn as_str(&self) -> &str {
        &self.val
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.val)
    }
}

impl<T: Entity> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple(&format!("Id<{}>", T::PREFIX))
            .field(&self.val)
            .finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if src.is_empty() {
            return Err(IdParseError::Empty);
        }
        // Ids are spliced into request paths.
        if let Some(c) = src
            .chars()
            .find(|c| c.is_whitespace() || *c == '/' || *c == '?' || *c == '#')
        {
            return Err(IdParseError::InvalidCharacter(c));
        }
        Ok(Id {
            val: src.to_string(),
            phantom: PhantomData,
        })
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.val.hash(state)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Id {
            val: self.val.clone(),
            phantom: PhantomData,
        }
    }
}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.val)
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdStrVisitor<T>(PhantomData<T>);
        impl<'vi, T: Entity> de::Visitor<'vi> for IdStrVisitor<T> {
            type Value = Id<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an Id string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Id<T>, E> {
                value.parse::<Id<T>>().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(IdStrVisitor(PhantomData))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct Canary;

    impl Entity for Canary {
        const PREFIX: &'static str = "canary";
    }

    #[test]
    fn round_trips_via_to_from_str() {
        let id = "65f1c0ffee".parse::<Id<Canary>>().expect("parse id");
        let s = id.to_string();
        let id2 = s.parse::<Id<Canary>>().expect("parse id");
        assert_eq!(id, id2);
    }

    #[test]
    fn serializes_to_bare_string() {
        let id = "65f1c0ffee".parse::<Id<Canary>>().expect("parse id");

        let json = serde_json::to_string(&id).expect("serde_json::to_string");
        assert_eq!(json, "\"65f1c0ffee\"");
        let id2: Id<Canary> = serde_json::from_str(&json).expect("serde_json::from_str");
        assert_eq!(id, id2);
    }

    #[test]
    fn should_reject_empty() {
        let result = "".parse::<Id<Canary>>();
        assert_eq!(result, Err(IdParseError::Empty));
    }

    #[test]
    fn should_reject_path_separators() {
        let result = "abc/def".parse::<Id<Canary>>();
        assert_eq!(result, Err(IdParseError::InvalidCharacter('/')));
    }

    #[test]
    fn should_reject_whitespace_when_deserializing() {
        let result = serde_json::from_str::<Id<Canary>>("\"a b\"");
        assert!(result.is_err(), "Parsing should fail; got {:?}", result);
    }

    #[test]
    fn debug_output_names_the_collection() {
        let id = "x1".parse::<Id<Canary>>().expect("parse id");
        assert_eq!(format!("{:?}", id), "Id<canary>(\"x1\")");
    }

    #[test]
    fn should_allow_ordering() {
        let a = "a1".parse::<Id<Canary>>().expect("parse id");
        let b = "b1".parse::<Id<Canary>>().expect("parse id");
        assert!(a < b);
    }
}
