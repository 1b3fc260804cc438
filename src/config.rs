//! Process configuration, read once at startup and immutable afterwards.

use {
    crate::{
        domain::error::PaymentError,
        signing::{HashAlgorithm, Signer, constant_time_compare},
        webhook::IpPolicy,
    },
    std::{fmt, time::Duration},
};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_VNPAY_PAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
const DEFAULT_MOMO_ENDPOINT: &str = "https://test-payment.momo.vn";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub signer: Signer,
    pub pay_url: String,
    pub return_url: String,
    pub ipn_policy: IpPolicy,
}

#[derive(Debug, Clone)]
pub struct MomoConfig {
    pub partner_code: String,
    pub access_key: String,
    pub signer: Signer,
    /// Base URL, e.g. `https://payment.momo.vn`.
    pub endpoint: String,
    pub redirect_url: String,
    pub ipn_url: String,
    pub request_type: String,
    pub ipn_policy: IpPolicy,
}

/// Bearer credential for operator routes such as refunds.
#[derive(Clone)]
pub struct AdminToken(Box<[u8]>);

impl AdminToken {
    pub fn new(token: &str) -> Self {
        Self(token.as_bytes().into())
    }

    pub fn matches(&self, presented: &str) -> bool {
        constant_time_compare(&self.0, presented.as_bytes())
    }
}

impl fmt::Debug for AdminToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminToken([redacted])")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    /// Payer-facing result page lives under this URL.
    pub frontend_url: String,
    pub vnpay: VnpayConfig,
    pub momo: MomoConfig,
    pub sweep_interval: Duration,
    pub provider_timeout: Duration,
    /// Take the client address from `X-Forwarded-For` (behind a proxy).
    pub trust_forwarded_for: bool,
    /// Unset disables the operator routes.
    pub admin_token: Option<AdminToken>,
}

impl Config {
    pub fn from_env() -> Result<Self, PaymentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Missing secrets are fatal.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PaymentError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| PaymentError::Configuration(format!("{key} must be set")))
        };

        let vnpay = VnpayConfig {
            tmn_code: require("VNPAY_TMN_CODE")?,
            signer: Signer::new(HashAlgorithm::HmacSha512, &require("VNPAY_HASH_SECRET")?)?,
            pay_url: get("VNPAY_PAY_URL").unwrap_or_else(|| DEFAULT_VNPAY_PAY_URL.to_string()),
            return_url: require("VNPAY_RETURN_URL")?,
            ipn_policy: IpPolicy::parse(get("VNPAY_IPN_ALLOWLIST").as_deref())?,
        };

        let momo = MomoConfig {
            partner_code: require("MOMO_PARTNER_CODE")?,
            access_key: require("MOMO_ACCESS_KEY")?,
            signer: Signer::new(HashAlgorithm::HmacSha256, &require("MOMO_SECRET_KEY")?)?,
            endpoint: get("MOMO_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_MOMO_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            redirect_url: require("MOMO_REDIRECT_URL")?,
            ipn_url: require("MOMO_IPN_URL")?,
            request_type: get("MOMO_REQUEST_TYPE").unwrap_or_else(|| "captureWallet".to_string()),
            ipn_policy: IpPolicy::parse(get("MOMO_IPN_ALLOWLIST").as_deref())?,
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            frontend_url: require("FRONTEND_URL")?.trim_end_matches('/').to_string(),
            vnpay,
            momo,
            sweep_interval: positive_secs(
                "SWEEP_INTERVAL_SECS",
                get("SWEEP_INTERVAL_SECS"),
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            provider_timeout: positive_secs(
                "PROVIDER_TIMEOUT_SECS",
                get("PROVIDER_TIMEOUT_SECS"),
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?,
            trust_forwarded_for: parse_or(get("TRUST_FORWARDED_FOR"), false)?,
            admin_token: get("ADMIN_API_TOKEN").map(|t| AdminToken::new(t.trim())),
        })
    }

    /// Log allow-list choices an operator should know about.
    pub fn warn_on_permissive_defaults(&self) {
        for (name, policy) in [
            ("VNPAY_IPN_ALLOWLIST", &self.vnpay.ipn_policy),
            ("MOMO_IPN_ALLOWLIST", &self.momo.ipn_policy),
        ] {
            match policy {
                IpPolicy::AllowAll => {
                    tracing::warn!(variable = name, "IPN allow-list is '*', accepting any source")
                }
                IpPolicy::DenyAll => {
                    tracing::warn!(variable = name, "IPN allow-list unset, rejecting every IPN")
                }
                IpPolicy::AllowList(list) => {
                    tracing::info!(variable = name, entries = list.len(), "IPN allow-list loaded")
                }
            }
        }
        if self.admin_token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN unset, refund route rejects every request");
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> Result<T, PaymentError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| PaymentError::Configuration(format!("cannot parse value: {v}"))),
    }
}

fn positive_secs(key: &str, raw: Option<String>, default: u64) -> Result<Duration, PaymentError> {
    match parse_or(raw, default)? {
        0 => Err(PaymentError::Configuration(format!("{key} must be at least 1"))),
        secs => Ok(Duration::from_secs(secs)),
    }
}
