use serde::de::Error as _;
use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

use crate::core::time::to_primitive_utc;

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub(crate) fn parse_datetime_flexible(raw: &str) -> Option<PrimitiveDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(to_primitive_utc(value));
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value);
    }
    PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
}

pub(crate) fn deserialize_option_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<PrimitiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
