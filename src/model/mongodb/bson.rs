use mongodb::bson::{doc, Document};

/// A filter matching the document with the given integer `_id`.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": id }
}

/// Store an optional `chrono` datetime as an optional BSON datetime.
///
/// Use together with `#[serde(default)]` so that a missing field reads as `None`.
pub mod optional_chrono_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .map(bson::DateTime::from_chrono)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<bson::DateTime>::deserialize(deserializer)?;
        Ok(value.map(bson::DateTime::to_chrono))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use mongodb::bson::{from_document, to_document, Bson};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(default, with = "optional_chrono_datetime")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn optional_datetimes_are_native_bson() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let document = to_document(&Stamped { at: Some(at) }).unwrap();
        assert!(matches!(document.get("at"), Some(Bson::DateTime(_))));
        let back: Stamped = from_document(document).unwrap();
        assert_eq!(back.at, Some(at));

        let missing: Stamped = from_document(doc! {}).unwrap();
        assert_eq!(missing.at, None);
        let null: Stamped = from_document(doc! { "at": Bson::Null }).unwrap();
        assert_eq!(null.at, None);
    }

    #[test]
    fn id_filter() {
        assert_eq!(u32_id_filter(7), doc! { "_id": 7_u32 });
    }
}
