//! Correlation ids, condition instance ids and timestamps.

use rand::Rng;
use strike_ledger::MutationKind;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const SUFFIX_LEN: usize = 9;

/// Generate a correlation id: `<kind>-<unix millis>-<9 base36 chars>`.
///
/// Unique per request across concurrent requesters with overwhelming
/// probability; the ledger rejects the rare collision.
pub fn correlation_id(kind: MutationKind) -> String {
    format!("{}-{}-{}", kind, unix_millis(), base36_suffix())
}

/// Generate an id for a freshly applied condition instance.
pub fn condition_instance_id() -> String {
    format!("cond-{}-{}", unix_millis(), base36_suffix())
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string())
}

fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

fn base36_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_has_kind_millis_and_suffix() {
        let id = correlation_id(MutationKind::Damage);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "damage");
        assert!(parts[1].parse::<i128>().is_ok());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn correlation_ids_differ() {
        let a = correlation_id(MutationKind::Heal);
        let b = correlation_id(MutationKind::Heal);
        assert_ne!(a, b);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let now = now_rfc3339();
        assert!(OffsetDateTime::parse(&now, &Rfc3339).is_ok(), "{now}");
    }
}
