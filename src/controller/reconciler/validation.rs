//! # Validation
//!
//! Duration parsing and validity resolution for certificate requests.

use crate::constants::DEFAULT_CERT_DURATION_SECS;
use crate::crd::CertificateRequest;
use crate::observability::metrics;
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

static DURATION_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+)(?P<unit>ms|s|m|h|d)")
        .expect("Failed to compile duration regex - this should never happen")
});

static DURATION_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(ms|s|m|h|d))+$")
        .expect("Failed to compile duration regex - this should never happen")
});

/// Parse Kubernetes duration string into std::time::Duration
/// Supports single and compound forms: "30s", "5m", "2160h", "90d", "1h30m"
/// Returns Duration or error if format is invalid
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let duration_lower = duration_trimmed.to_lowercase();
    if !DURATION_FORMAT.is_match(&duration_lower) {
        return Err(anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit>[...] (e.g., '30m', '2160h', '1h30m')",
            duration_trimmed
        ));
    }

    let mut total = Duration::ZERO;
    for captures in DURATION_SEGMENT.captures_iter(&duration_lower) {
        let number: u64 = captures["number"].parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid duration number '{}' in '{}': {}",
                &captures["number"],
                duration_trimmed,
                e
            )
        })?;

        let segment = match &captures["unit"] {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number.saturating_mul(60)),
            "h" => Duration::from_secs(number.saturating_mul(3600)),
            "d" => Duration::from_secs(number.saturating_mul(86400)),
            unit => {
                return Err(anyhow::anyhow!(
                    "Invalid unit '{}' in duration '{}'. Expected: ms, s, m, h, or d",
                    unit,
                    duration_trimmed
                ));
            }
        };
        total = total.saturating_add(segment);
    }

    Ok(total)
}

/// Validity to request for a certificate
///
/// The request's own duration when set and non-zero, otherwise the default.
/// An unparsable duration falls back to the default and is logged.
pub fn certificate_duration(request: &CertificateRequest) -> Duration {
    let default = Duration::from_secs(DEFAULT_CERT_DURATION_SECS);

    let Some(raw) = request.spec.duration.as_deref() else {
        return default;
    };

    match parse_kubernetes_duration(raw) {
        Ok(duration) if duration.is_zero() => default,
        Ok(duration) => duration,
        Err(e) => {
            warn!(
                resource.name = request.metadata.name.as_deref().unwrap_or("unknown"),
                duration = raw,
                error = %e,
                "Invalid spec.duration, using default certificate duration"
            );
            metrics::increment_duration_parsing_errors();
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{CertificateRequestSpec, IssuerRef};

    fn request_with_duration(duration: Option<&str>) -> CertificateRequest {
        CertificateRequest::new(
            "test",
            CertificateRequestSpec {
                request: "csr".to_string(),
                duration: duration.map(str::to_string),
                issuer_ref: IssuerRef {
                    name: "vault".to_string(),
                },
                is_ca: false,
            },
        )
    }

    #[test]
    fn test_parse_kubernetes_duration_single_units() {
        assert_eq!(parse_kubernetes_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_kubernetes_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_kubernetes_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_kubernetes_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_kubernetes_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_kubernetes_duration_compound() {
        assert_eq!(
            parse_kubernetes_duration("1h30m").unwrap(),
            Duration::from_secs(5400)
        );
        assert_eq!(
            parse_kubernetes_duration(" 2160H ").unwrap(),
            Duration::from_secs(2160 * 3600)
        );
    }

    #[test]
    fn test_parse_kubernetes_duration_rejects_garbage() {
        assert!(parse_kubernetes_duration("").is_err());
        assert!(parse_kubernetes_duration("ten minutes").is_err());
        assert!(parse_kubernetes_duration("10").is_err());
        assert!(parse_kubernetes_duration("10w").is_err());
        assert!(parse_kubernetes_duration("-5m").is_err());
    }

    #[test]
    fn test_certificate_duration_defaults_when_unset() {
        let request = request_with_duration(None);
        assert_eq!(
            certificate_duration(&request),
            Duration::from_secs(DEFAULT_CERT_DURATION_SECS)
        );
    }

    #[test]
    fn test_certificate_duration_defaults_when_zero() {
        let request = request_with_duration(Some("0s"));
        assert_eq!(
            certificate_duration(&request),
            Duration::from_secs(DEFAULT_CERT_DURATION_SECS)
        );
    }

    #[test]
    fn test_certificate_duration_uses_request_value() {
        let request = request_with_duration(Some("24h"));
        assert_eq!(certificate_duration(&request), Duration::from_secs(86400));
    }

    #[test]
    fn test_certificate_duration_defaults_when_invalid() {
        let request = request_with_duration(Some("forever"));
        assert_eq!(
            certificate_duration(&request),
            Duration::from_secs(DEFAULT_CERT_DURATION_SECS)
        );
    }
}
