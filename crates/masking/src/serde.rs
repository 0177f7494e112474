//!
//! Serde-related.
//!

pub use serde::{de, Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{PeekInterface, Secret, Strategy};

/// Marker trait for secret types which can be [`Serialize`]-d by [`serde`].
///
/// Only types marked with this trait get a `Serialize` impl for `Secret<T>`, so a secret can not
/// be written into a log line or API response by accident.
pub trait SerializableSecret: Serialize {}

impl SerializableSecret for String {}
impl SerializableSecret for Value {}

impl<'de, T, I> Deserialize<'de> for Secret<T, I>
where
    T: de::DeserializeOwned + Sized,
    I: Strategy<T>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::new)
    }
}

impl<T, I> Serialize for Secret<T, I>
where
    T: SerializableSecret + Sized,
    I: Strategy<T>,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.peek().serialize(serializer)
    }
}
