//! Gate for server-to-server notifications: source IP allow-list, then
//! signature.

use {
    crate::{
        domain::error::PaymentError,
        signing::{
            Signer,
            canonical::{CanonicalRule, Params},
        },
    },
    std::net::IpAddr,
};

const MAPPED_PREFIX: &str = "::ffff:";

/// Strip an IPv4-mapped IPv6 prefix and parse. `::ffff:203.0.113.5` and
/// `203.0.113.5` normalize to the same address.
pub fn normalize_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    let stripped = match raw.get(..MAPPED_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MAPPED_PREFIX) && raw.contains('.') => {
            &raw[MAPPED_PREFIX.len()..]
        }
        _ => raw,
    };
    let addr: IpAddr = stripped.parse().ok()?;
    Some(match addr {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPolicy {
    /// Explicit `*`. Every source passes.
    AllowAll,
    AllowList(Vec<IpAddr>),
    /// Nothing configured.
    DenyAll,
}

impl IpPolicy {
    /// `None`/blank → `DenyAll`, `*` → `AllowAll`, otherwise a comma-separated
    /// address list.
    pub fn parse(raw: Option<&str>) -> Result<Self, PaymentError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::DenyAll);
        };
        if raw == "*" {
            return Ok(Self::AllowAll);
        }
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| {
                normalize_ip(entry).ok_or_else(|| {
                    PaymentError::Configuration(format!("invalid allow-list entry: {entry}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::AllowList)
    }

    pub fn permits(&self, source_ip: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DenyAll => false,
            Self::AllowList(list) => normalize_ip(source_ip).is_some_and(|ip| list.contains(&ip)),
        }
    }
}

#[derive(Debug)]
pub struct WebhookAuthenticator {
    policy: IpPolicy,
    signer: Signer,
    rule: &'static CanonicalRule,
}

impl WebhookAuthenticator {
    pub fn new(policy: IpPolicy, signer: Signer, rule: &'static CanonicalRule) -> Self {
        Self {
            policy,
            signer,
            rule,
        }
    }

    /// Both checks must pass before the payload may reach the reconciler.
    pub fn authenticate(
        &self,
        source_ip: &str,
        params: &Params,
        claimed_signature: Option<&str>,
    ) -> Result<(), PaymentError> {
        if !self.policy.permits(source_ip) {
            tracing::warn!(source_ip, "webhook from source outside allow-list");
            return Err(PaymentError::UnauthorizedSource(source_ip.to_string()));
        }
        if !self.signer.verify(params, claimed_signature, self.rule) {
            tracing::warn!(source_ip, "webhook signature mismatch");
            return Err(PaymentError::InvalidSignature);
        }
        Ok(())
    }
}
