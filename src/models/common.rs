use serde::de::{Error, Visitor};
use std::fmt;

// Form controls and query strings send numbers as text, JSON clients as numbers
pub fn deserialize_u32_from_number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumberOrString;

    impl<'de> Visitor<'de> for NumberOrString {
        type Value = u32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative integer or a string holding one")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u32::try_from(value).map_err(|_| E::custom(format!("{} is too large", value)))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u32::try_from(value).map_err(|_| E::custom(format!("{} is out of range", value)))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("'{}' is not a valid number", value)))
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

// Mercado Pago returns payment and order ids as JSON numbers, preferences as strings
pub fn deserialize_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or integer id")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(value.to_string())
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(value.to_owned())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Count {
        #[serde(deserialize_with = "deserialize_u32_from_number_or_string")]
        n: u32,
    }

    #[derive(Deserialize)]
    struct Id {
        #[serde(deserialize_with = "deserialize_id_string")]
        id: String,
    }

    #[test]
    fn counts_from_numbers_and_strings() {
        assert_eq!(serde_json::from_str::<Count>(r#"{"n":6}"#).unwrap().n, 6);
        assert_eq!(serde_json::from_str::<Count>(r#"{"n":" 15 "}"#).unwrap().n, 15);
        assert!(serde_json::from_str::<Count>(r#"{"n":-1}"#).is_err());
        assert!(serde_json::from_str::<Count>(r#"{"n":"six"}"#).is_err());
    }

    #[test]
    fn ids_from_numbers_and_strings() {
        assert_eq!(serde_json::from_str::<Id>(r#"{"id":123456}"#).unwrap().id, "123456");
        assert_eq!(serde_json::from_str::<Id>(r#"{"id":"123-abc"}"#).unwrap().id, "123-abc");
    }
}
