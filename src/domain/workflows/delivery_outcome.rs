use crate::domain::entities::delivery_attempt::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Failure kinds of the delivery pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("invalid endpoint configuration: {0}")]
    Configuration(String),

    #[error("transient delivery failure ({}): {reason}", .kind.as_str())]
    TransientDelivery {
        kind: ErrorKind,
        status: Option<u16>,
        reason: String,
    },

    #[error("permanent delivery failure (status {status}): {reason}")]
    PermanentDelivery { status: u16, reason: String },

    #[error("retry budget exhausted after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Permanent,
}

/// Map a receiver status code onto the retry decision.
///
/// 408 and 429 are treated like server errors: the receiver asked us to come back later.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        408 | 429 => StatusClass::Transient,
        400..=499 => StatusClass::Permanent,
        _ => StatusClass::Transient,
    }
}

/// Reject URLs the delivery client must never call.
///
/// Checks that the URL parses, uses http or https, has a host, and (unless
/// `allow_private_hosts`) that the host is not loopback, private, link-local
/// or an internal name.
pub fn validate_endpoint_url(url: &str, allow_private_hosts: bool) -> Result<(), DeliveryError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DeliveryError::Configuration(format!("invalid url: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(DeliveryError::Configuration(format!(
                "unsupported url scheme: {scheme}"
            )));
        }
    }

    let Some(host) = parsed.host() else {
        return Err(DeliveryError::Configuration(
            "url must have a host".to_string(),
        ));
    };

    if allow_private_hosts {
        return Ok(());
    }

    let internal = match host {
        url::Host::Ipv4(ip) => is_internal_ipv4(ip),
        url::Host::Ipv6(ip) => is_internal_ipv6(ip),
        url::Host::Domain(name) => {
            let lower = name.to_ascii_lowercase();
            lower == "localhost"
                || lower.ends_with(".localhost")
                || lower.ends_with(".internal")
                || lower.ends_with(".local")
        }
    };
    if internal {
        return Err(DeliveryError::Configuration(format!(
            "destination host {host} is a private or internal address"
        )));
    }

    Ok(())
}

fn is_internal_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        // 100.64.0.0/10
        || (octets[0] == 100 && (octets[1] & 0xC0) == 64)
}

fn is_internal_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_internal_ipv4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_status_codes_when_classified_should_split_success_transient_permanent() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(204), StatusClass::Success);
        assert_eq!(classify_status(400), StatusClass::Permanent);
        assert_eq!(classify_status(404), StatusClass::Permanent);
        assert_eq!(classify_status(410), StatusClass::Permanent);
        assert_eq!(classify_status(408), StatusClass::Transient);
        assert_eq!(classify_status(429), StatusClass::Transient);
        assert_eq!(classify_status(500), StatusClass::Transient);
        assert_eq!(classify_status(503), StatusClass::Transient);
        assert_eq!(classify_status(302), StatusClass::Transient);
    }

    #[test]
    fn given_public_https_url_when_validated_should_pass() {
        assert!(validate_endpoint_url("https://hooks.example.com/jobs", false).is_ok());
        assert!(validate_endpoint_url("http://hooks.example.com:8443/jobs", false).is_ok());
    }

    #[test]
    fn given_malformed_or_non_http_url_when_validated_should_be_configuration_error() {
        for url in ["not a url", "ftp://example.com/x", "mailto:ops@example.com"] {
            assert!(matches!(
                validate_endpoint_url(url, true),
                Err(DeliveryError::Configuration(_))
            ));
        }
    }

    #[test]
    fn given_private_hosts_when_not_allowed_should_reject() {
        for url in [
            "http://127.0.0.1/hook",
            "http://10.1.2.3/hook",
            "http://192.168.0.10/hook",
            "http://169.254.169.254/latest/meta-data",
            "http://100.64.0.1/hook",
            "http://[::1]/hook",
            "http://[fd00::1]/hook",
            "http://localhost:8080/hook",
            "http://metadata.google.internal/",
        ] {
            assert!(
                validate_endpoint_url(url, false).is_err(),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn given_private_hosts_when_allowed_should_pass() {
        assert!(validate_endpoint_url("http://127.0.0.1:9000/hook", true).is_ok());
        assert!(validate_endpoint_url("http://localhost/hook", true).is_ok());
    }
}
