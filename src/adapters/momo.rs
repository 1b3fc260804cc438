use {
    crate::{
        config::MomoConfig,
        domain::{
            error::PaymentError,
            id::{OrderId, TransId},
            money::Amount,
            order::Order,
            payment::{PaymentCallback, PaymentOutcome, PaymentRequest, Provider},
            ports::{PortFuture, RefundGateway, RefundReceipt},
        },
        signing::{
            canonical::{CanonicalRule, Params},
            keys::{MOMO_CALLBACK, MOMO_CREATE, MOMO_CREATE_RESPONSE, MOMO_IPN, MOMO_REFUND},
        },
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

pub const CREATE_RULE: CanonicalRule = CanonicalRule::Ordered(&MOMO_CREATE);
pub const CREATE_RESPONSE_RULE: CanonicalRule = CanonicalRule::Ordered(&MOMO_CREATE_RESPONSE);
pub const CALLBACK_RULE: CanonicalRule = CanonicalRule::Ordered(&MOMO_CALLBACK);
pub const IPN_RULE: CanonicalRule = CanonicalRule::Ordered(&MOMO_IPN);
pub const REFUND_RULE: CanonicalRule = CanonicalRule::Ordered(&MOMO_REFUND);

const CREATE_PATH: &str = "/v2/gateway/api/create";
const REFUND_PATH: &str = "/v2/gateway/api/refund";
const LANG: &str = "vi";

fn params_from<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    partner_code: &'a str,
    request_id: &'a str,
    amount: i64,
    order_id: &'a str,
    order_info: &'a str,
    redirect_url: &'a str,
    ipn_url: &'a str,
    request_type: &'a str,
    extra_data: &'a str,
    lang: &'static str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentResponse {
    #[serde(default)]
    partner_code: String,
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    response_time: i64,
    #[serde(default)]
    message: String,
    result_code: i64,
    pay_url: Option<String>,
    signature: Option<String>,
}

/// IPN body as posted by MoMo.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoNotification {
    pub partner_code: String,
    pub order_id: String,
    pub request_id: String,
    pub amount: i64,
    #[serde(default)]
    pub order_info: String,
    #[serde(default)]
    pub order_type: String,
    pub trans_id: i64,
    pub result_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub pay_type: String,
    pub response_time: i64,
    #[serde(default)]
    pub extra_data: String,
    #[serde(default)]
    pub signature: String,
}

impl MomoNotification {
    /// Flatten to the signed parameter set. `accessKey` is never sent by MoMo
    /// but is part of the signature.
    pub fn to_params(&self, access_key: &str) -> Params {
        params_from([
            ("accessKey", access_key.to_string()),
            ("amount", self.amount.to_string()),
            ("extraData", self.extra_data.clone()),
            ("message", self.message.clone()),
            ("orderId", self.order_id.clone()),
            ("orderInfo", self.order_info.clone()),
            ("orderType", self.order_type.clone()),
            ("partnerCode", self.partner_code.clone()),
            ("payType", self.pay_type.clone()),
            ("requestId", self.request_id.clone()),
            ("responseTime", self.response_time.to_string()),
            ("resultCode", self.result_code.to_string()),
            ("transId", self.trans_id.to_string()),
            ("signature", self.signature.clone()),
        ])
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundBody<'a> {
    partner_code: &'a str,
    order_id: &'a str,
    request_id: &'a str,
    amount: i64,
    trans_id: i64,
    lang: &'static str,
    description: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefundResponse {
    #[serde(default)]
    trans_id: i64,
    result_code: i64,
    #[serde(default)]
    message: String,
}

fn required<'a>(params: &'a Params, key: &str) -> Result<&'a str, PaymentError> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::Validation(format!("missing {key}")))
}

/// Map redirect or IPN parameters to a callback. The signature must have been
/// checked on the same `params` first.
pub fn parse_callback(
    params: &Params,
    source_ip: Option<String>,
) -> Result<PaymentCallback, PaymentError> {
    let result_code = required(params, "resultCode")?.to_string();
    let code: i64 = result_code
        .parse()
        .map_err(|_| PaymentError::Validation(format!("invalid resultCode: {result_code}")))?;

    Ok(PaymentCallback {
        provider: Provider::Momo,
        order_id: OrderId::new(required(params, "orderId")?)?,
        trans_id: TransId::new(required(params, "transId")?)?,
        outcome: PaymentOutcome::from_momo(code),
        result_code,
        amount: Amount::parse(required(params, "amount")?)?,
        message: params.get("message").cloned().unwrap_or_default(),
        response_time: params.get("responseTime").cloned().unwrap_or_default(),
        signature: params.get("signature").cloned().unwrap_or_default(),
        source_ip,
    })
}

/// Outbound MoMo API calls. Every request is bounded by the client timeout
/// and tried once.
pub struct MomoClient {
    config: MomoConfig,
    http: reqwest::Client,
}

impl MomoClient {
    pub fn new(config: MomoConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("http client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &MomoConfig {
        &self.config
    }

    /// Signed parameter set for a create-payment call.
    pub fn create_params(&self, request: &PaymentRequest) -> Params {
        let cfg = &self.config;
        params_from([
            ("accessKey", cfg.access_key.clone()),
            ("amount", request.amount.to_string()),
            ("extraData", request.extra_data.clone()),
            ("ipnUrl", request.notify_url.clone()),
            ("orderId", request.order_id.to_string()),
            ("orderInfo", request.order_info.clone()),
            ("partnerCode", cfg.partner_code.clone()),
            ("redirectUrl", request.return_url.clone()),
            ("requestId", request.request_id.clone()),
            ("requestType", cfg.request_type.clone()),
        ])
    }

    /// Register the payment with MoMo and return the URL to send the payer to.
    #[tracing::instrument(name = "momo_create", skip_all, fields(order_id = %request.order_id))]
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<String, PaymentError> {
        let cfg = &self.config;
        let signature = cfg.signer.sign(&self.create_params(request), &CREATE_RULE);
        let order_id = request.order_id.to_string();
        let body = CreatePaymentBody {
            partner_code: &cfg.partner_code,
            request_id: &request.request_id,
            amount: request.amount.value(),
            order_id: &order_id,
            order_info: &request.order_info,
            redirect_url: &request.return_url,
            ipn_url: &request.notify_url,
            request_type: &cfg.request_type,
            extra_data: &request.extra_data,
            lang: LANG,
            signature,
        };

        let response: CreatePaymentResponse = self
            .http
            .post(format!("{}{CREATE_PATH}", cfg.endpoint))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if response.result_code != 0 {
            tracing::warn!(
                result_code = response.result_code,
                message = %response.message,
                "MoMo rejected create-payment"
            );
            return Err(PaymentError::Provider(format!(
                "MoMo create-payment failed with resultCode {}",
                response.result_code
            )));
        }

        let pay_url = response
            .pay_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PaymentError::Provider("MoMo response has no payUrl".into()))?;

        if let Some(sig) = response.signature.as_deref() {
            let params = params_from([
                ("accessKey", cfg.access_key.clone()),
                ("amount", response.amount.to_string()),
                ("message", response.message.clone()),
                ("orderId", response.order_id.clone()),
                ("partnerCode", response.partner_code.clone()),
                ("payUrl", pay_url.clone()),
                ("requestId", response.request_id.clone()),
                ("responseTime", response.response_time.to_string()),
                ("resultCode", response.result_code.to_string()),
            ]);
            if !cfg.signer.verify(&params, Some(sig), &CREATE_RESPONSE_RULE) {
                tracing::warn!("MoMo create-payment response signature mismatch");
                return Err(PaymentError::InvalidSignature);
            }
        }

        Ok(pay_url)
    }

    async fn refund_inner(
        &self,
        order: &Order,
        request_id: &str,
    ) -> Result<RefundReceipt, PaymentError> {
        if order.provider != Some(Provider::Momo) {
            return Err(PaymentError::Validation(format!(
                "order {} was not paid through MoMo",
                order.id
            )));
        }
        let trans_id: i64 = order
            .trans_id
            .as_ref()
            .and_then(|t| t.as_str().parse().ok())
            .ok_or_else(|| {
                PaymentError::Validation(format!("order {} has no MoMo transId", order.id))
            })?;
        let amount = order.paid_amount.unwrap_or(order.amount).value();
        let description = format!("Hoan tien don hang {}", order.id);

        let cfg = &self.config;
        // MoMo wants a fresh orderId per refund; the request id doubles as it.
        let params = params_from([
            ("accessKey", cfg.access_key.clone()),
            ("amount", amount.to_string()),
            ("description", description.clone()),
            ("orderId", request_id.to_string()),
            ("partnerCode", cfg.partner_code.clone()),
            ("requestId", request_id.to_string()),
            ("transId", trans_id.to_string()),
        ]);
        let body = RefundBody {
            partner_code: &cfg.partner_code,
            order_id: request_id,
            request_id,
            amount,
            trans_id,
            lang: LANG,
            description: &description,
            signature: cfg.signer.sign(&params, &REFUND_RULE),
        };

        let response: RefundResponse = self
            .http
            .post(format!("{}{REFUND_PATH}", cfg.endpoint))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if response.result_code != 0 {
            tracing::warn!(
                result_code = response.result_code,
                message = %response.message,
                "MoMo rejected refund"
            );
            return Err(PaymentError::Provider(format!(
                "MoMo refund failed with resultCode {}",
                response.result_code
            )));
        }

        Ok(RefundReceipt {
            refund_trans_id: TransId::new(response.trans_id.to_string())?,
            result_code: response.result_code.to_string(),
        })
    }
}

impl RefundGateway for MomoClient {
    fn refund<'a>(
        &'a self,
        order: &'a Order,
        request_id: &'a str,
    ) -> PortFuture<'a, RefundReceipt> {
        Box::pin(self.refund_inner(order, request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        signing::{HashAlgorithm, Signer},
        webhook::IpPolicy,
    };

    fn config() -> MomoConfig {
        MomoConfig {
            partner_code: "MOMO".into(),
            access_key: "F8BBA842ECF85".into(),
            signer: Signer::new(HashAlgorithm::HmacSha256, "K951B6PE1waDMi640xX08PD3vg6EkVlz")
                .unwrap(),
            endpoint: "https://test-payment.momo.vn".into(),
            redirect_url: "https://lms.example.com/payments/momo/return".into(),
            ipn_url: "https://lms.example.com/payments/momo/ipn".into(),
            request_type: "captureWallet".into(),
            ipn_policy: IpPolicy::DenyAll,
        }
    }

    #[test]
    fn create_params_match_documented_signature() {
        let client = MomoClient::new(config(), Duration::from_secs(5)).unwrap();
        let request = PaymentRequest {
            provider: Provider::Momo,
            order_id: OrderId::new("ORD123").unwrap(),
            amount: Amount::new(50_000).unwrap(),
            order_info: "Thanh toan khoa hoc".into(),
            return_url: "https://lms.example.com/payments/momo/return".into(),
            notify_url: "https://lms.example.com/payments/momo/ipn".into(),
            request_id: "ORD123-req".into(),
            extra_data: String::new(),
        };
        let params = client.create_params(&request);
        assert_eq!(
            client.config().signer.sign(&params, &CREATE_RULE),
            "72117d833a63d532964de5617e9be2cd6491e6d5087c01225246e399d5fe6627"
        );
    }

    #[test]
    fn notification_flattens_numbers_as_integers() {
        let n: MomoNotification = serde_json::from_value(serde_json::json!({
            "partnerCode": "MOMO",
            "orderId": "ORD1",
            "requestId": "req-1",
            "amount": 50000,
            "orderInfo": "Thanh toan",
            "orderType": "momo_wallet",
            "transId": 4088878653i64,
            "resultCode": 0,
            "message": "Successful.",
            "payType": "qr",
            "responseTime": 1721720663942i64,
            "extraData": "",
            "signature": "abc"
        }))
        .unwrap();
        let params = n.to_params("AK");
        assert_eq!(params["amount"], "50000");
        assert_eq!(params["transId"], "4088878653");
        assert_eq!(params["accessKey"], "AK");

        let cb = parse_callback(&params, Some("203.0.113.5".into())).unwrap();
        assert_eq!(cb.outcome, PaymentOutcome::Success);
        assert_eq!(cb.amount.value(), 50_000);
        assert_eq!(cb.signature, "abc");
    }

    #[test]
    fn parse_callback_rejects_non_numeric_result_code() {
        let params = params_from([
            ("orderId", "ORD1".to_string()),
            ("transId", "1".to_string()),
            ("resultCode", "ok".to_string()),
            ("amount", "1".to_string()),
        ]);
        assert!(matches!(
            parse_callback(&params, None),
            Err(PaymentError::Validation(_))
        ));
    }
}
