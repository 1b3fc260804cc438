pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod signing;
pub mod webhook;

use {
    adapters::momo::MomoClient,
    config::Config,
    services::{reconciler::Reconciler, refund::Refunder},
    std::sync::Arc,
    webhook::WebhookAuthenticator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub reconciler: Reconciler,
    pub refunder: Refunder,
    pub vnpay_ipn: Arc<WebhookAuthenticator>,
    pub momo_ipn: Arc<WebhookAuthenticator>,
    pub momo: Arc<MomoClient>,
}

impl AppState {
    /// Wire the HTTP state around already-built storage ports.
    pub fn new(
        config: Config,
        reconciler: Reconciler,
    ) -> Result<Self, domain::error::PaymentError> {
        let momo = Arc::new(MomoClient::new(config.momo.clone(), config.provider_timeout)?);
        let refunder = Refunder::new(reconciler.store().clone(), momo.clone());
        let vnpay_ipn = WebhookAuthenticator::new(
            config.vnpay.ipn_policy.clone(),
            config.vnpay.signer.clone(),
            &signing::canonical::VNPAY_SORTED,
        );
        let momo_ipn = WebhookAuthenticator::new(
            config.momo.ipn_policy.clone(),
            config.momo.signer.clone(),
            &adapters::momo::IPN_RULE,
        );
        Ok(Self {
            config: Arc::new(config),
            reconciler,
            refunder,
            vnpay_ipn: Arc::new(vnpay_ipn),
            momo_ipn: Arc::new(momo_ipn),
            momo,
        })
    }
}
