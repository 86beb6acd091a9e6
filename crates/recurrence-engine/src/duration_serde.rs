//! Serde adapters that carry a [`TimeDelta`] as whole seconds.

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serializer};

pub mod seconds {
    use super::*;

    pub fn serialize<S: Serializer>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        TimeDelta::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("duration out of range: {}s", secs)))
    }
}

pub mod option_seconds {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(delta) => serializer.serialize_some(&delta.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        Option::<i64>::deserialize(deserializer)?
            .map(|secs| {
                TimeDelta::try_seconds(secs).ok_or_else(|| {
                    serde::de::Error::custom(format!("duration out of range: {}s", secs))
                })
            })
            .transpose()
    }
}
