use std::time::Duration;

use crate::error::ValidationError;

const MAX_DURATION_NANOS: u128 = i64::MAX as u128;

/// Parse a user supplied port into a TCP port number (1..=65535).
pub fn parse_port(raw: &str) -> Result<u16, ValidationError> {
    let invalid = |reason| ValidationError::InvalidPort {
        value: raw.to_string(),
        reason,
    };
    let val: i64 = raw.parse().map_err(|_| invalid("must be a number"))?;
    if !(1..=65535).contains(&val) {
        return Err(invalid("must be between 1 and 65535"));
    }
    Ok(val as u16)
}

/// Parse the overall wait budget.
///
/// Accepted forms:
/// - a duration expression made of `<number><unit>` pairs: `30s`, `5m`, `1h30m`, `0.5m`
///   (units `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`)
/// - a bare number of seconds: `30`, `2.5`
///
/// The result must be strictly positive.
pub fn parse_timeout(raw: &str) -> Result<Duration, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidTimeout {
        value: raw.to_string(),
        reason,
    };

    let parsed = match parse_duration_expr(raw) {
        Ok(v) => Ok(v),
        Err(_) if is_bare_number(raw) => parse_duration_expr(&format!("{raw}s")),
        Err(e) => Err(e),
    };
    let (negative, duration) = parsed.map_err(invalid)?;

    if negative || duration.is_zero() {
        return Err(invalid("timeout must be positive".to_string()));
    }
    Ok(duration)
}

fn is_bare_number(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Returns the sign separately so that `-5s` can be reported as non-positive
/// rather than as a syntax error.
fn parse_duration_expr(s: &str) -> Result<(bool, Duration), String> {
    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Ok((negative, Duration::ZERO));
    }
    if rest.is_empty() {
        return Err(format!("invalid duration \"{s}\""));
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_len];
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(format!("invalid duration \"{s}\""));
        }
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            return Err(format!("missing unit in duration \"{s}\""));
        }
        let unit_nanos = unit_nanos(unit)
            .ok_or_else(|| format!("unknown unit \"{unit}\" in duration \"{s}\""))?;
        rest = &rest[unit_len..];

        let overflow = || format!("invalid duration \"{s}\"");
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        // Digits past nanosecond precision of an hour cannot matter.
        let frac = &frac[..frac.len().min(18)];
        let frac_nanos = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| overflow())?;
            digits * unit_nanos / 10u128.pow(frac.len() as u32)
        };
        total_nanos = whole
            .checked_mul(unit_nanos)
            .and_then(|n| n.checked_add(frac_nanos))
            .and_then(|n| n.checked_add(total_nanos))
            .ok_or_else(overflow)?;
    }

    // Same ceiling as a signed 64-bit nanosecond count, roughly 292 years.
    if total_nanos > MAX_DURATION_NANOS {
        return Err(format!("invalid duration \"{s}\""));
    }
    let duration = Duration::new(
        (total_nanos / 1_000_000_000) as u64,
        (total_nanos % 1_000_000_000) as u32,
    );
    Ok((negative, duration))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3600 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_bounds() {
        assert_eq!(parse_port("1").unwrap(), 1);
        assert_eq!(parse_port("65535").unwrap(), 65535);
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
        assert!(parse_port("-22").is_err());
    }

    #[test]
    fn port_error_names_value_and_reason() {
        let err = parse_port("ssh").unwrap_err();
        assert_eq!(err.to_string(), "invalid port 'ssh': must be a number");
        let err = parse_port("70000").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid port '70000': must be between 1 and 65535"
        );
    }

    #[test]
    fn compound_and_fractional_durations() {
        assert_eq!(parse_timeout("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_timeout("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_timeout("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_timeout("2.5").unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn partial_numbers_do_not_succeed() {
        assert!(parse_timeout("30x").is_err());
        assert!(parse_timeout("5 m").is_err());
        assert!(parse_timeout("").is_err());
        assert!(parse_timeout("1.2.3").is_err());
        assert!(parse_timeout("m").is_err());
    }

    #[test]
    fn non_positive_is_rejected_with_reason() {
        let err = parse_timeout("-5s").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTimeout {
                value: "-5s".into(),
                reason: "timeout must be positive".into()
            }
        );
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("0.0").is_err());
    }

    #[test]
    fn durations_past_292_years_are_rejected() {
        assert_eq!(
            parse_timeout("2562047h").unwrap(),
            Duration::from_secs(2_562_047 * 3600)
        );
        for raw in ["2562048h", "3000000000000000h", "99999999999999999999"] {
            let err = parse_timeout(raw).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidTimeout { ref reason, .. } if reason.starts_with("invalid duration")),
                "{raw} -> {err:?}"
            );
        }
    }
}
