//! Types and capability traits that generated code depends on.
//!
//! Generated records implement [`SheetRecord`]; generated containers implement
//! [`TableContainer`] or [`ConstContainer`]. Once compiled, a host program
//! registers its containers with [`crate::binding::TypeRegistry`] and the
//! binder works purely through these traits.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Two-element value declared as `pair<K,V>` in a sheet header.
///
/// Serializes as a two-element JSON array `[key, value]`, the same encoding
/// the value generator emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Pair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self { key, value }
    }
}

impl<K: Serialize, V: Serialize> Serialize for Pair<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.key, &self.value).serialize(serializer)
    }
}

/// `null` (an unparseable pair cell) reads as the default pair.
impl<'de, K, V> Deserialize<'de> for Pair<K, V>
where
    K: Deserialize<'de> + Default,
    V: Deserialize<'de> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<(K, V)>::deserialize(deserializer)?
            .map(Pair::from)
            .unwrap_or_default())
    }
}

/// A generated plain data record.
pub trait SheetRecord: Serialize + DeserializeOwned + Default + 'static {
    /// Fully qualified name recorded on generation jobs.
    const TYPE_NAME: &'static str;
}

/// A generated container holding every row of a Table sheet.
pub trait TableContainer: Serialize + Default + 'static {
    type Record: SheetRecord;

    const TYPE_NAME: &'static str;

    fn set_values(&mut self, values: Vec<Self::Record>);

    fn set_metadata(&mut self, sheet_id: &str, sheet_name: &str);
}

/// A generated container holding the single record of a Const sheet.
pub trait ConstContainer: Serialize + Default + 'static {
    type Record: SheetRecord;

    const TYPE_NAME: &'static str;

    fn set_single_value(&mut self, value: Self::Record);

    fn set_metadata(&mut self, sheet_id: &str, sheet_name: &str);
}
