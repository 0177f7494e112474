#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    clippy::expect_used,
    clippy::unwrap_used
)]
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR" ), "/", "README.md"))]

pub mod consts;
pub mod crypto;
pub mod errors;
pub mod ext_traits;
pub mod request;

/// Date-time utilities.
pub mod date_time {
    use time::{OffsetDateTime, PrimitiveDateTime};

    /// Create a new [`PrimitiveDateTime`] with the current date and time in UTC.
    pub fn now() -> PrimitiveDateTime {
        let utc_date_time = OffsetDateTime::now_utc();
        PrimitiveDateTime::new(utc_date_time.date(), utc_date_time.time())
    }

    /// Convert from OffsetDateTime to PrimitiveDateTime
    pub fn convert_to_pdt(offset_time: OffsetDateTime) -> PrimitiveDateTime {
        let utc = offset_time.to_offset(time::UtcOffset::UTC);
        PrimitiveDateTime::new(utc.date(), utc.time())
    }

    /// Current unix timestamp in seconds
    pub fn now_unix_timestamp() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    /// Parse an RFC 3339 timestamp, as sent by most providers, into UTC.
    pub fn parse_rfc3339(value: &str) -> Option<PrimitiveDateTime> {
        OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
            .ok()
            .map(convert_to_pdt)
    }
}

/// Functional programming helpers.
pub mod fp_utils {
    /// Run `f` only when `predicate` holds, otherwise return `Ok(())`.
    pub fn when<W, F>(predicate: bool, f: F) -> Result<(), W>
    where
        F: FnOnce() -> Result<(), W>,
    {
        if predicate {
            f()
        } else {
            Ok(())
        }
    }
}

/// Generate a nanoid with the given prefix and length
#[inline]
pub fn generate_id(length: usize, prefix: &str) -> String {
    format!("{}_{}", prefix, nanoid::nanoid!(length, &consts::ALPHABETS))
}

/// Generate a nanoid with the given prefix and a default length
#[inline]
pub fn generate_id_with_default_len(prefix: &str) -> String {
    generate_id(consts::ID_LENGTH, prefix)
}
