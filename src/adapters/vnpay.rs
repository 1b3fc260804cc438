use {
    crate::{
        config::VnpayConfig,
        domain::{
            error::PaymentError,
            id::{OrderId, TransId},
            money::Amount,
            payment::{PaymentCallback, PaymentOutcome, PaymentRequest, Provider},
        },
        signing::canonical::{Params, VNPAY_SORTED},
    },
    chrono::{DateTime, Duration, Utc},
};

pub const VERSION: &str = "2.1.0";
pub const SECURE_HASH: &str = "vnp_SecureHash";

/// VNPay timestamps are local time in Vietnam (UTC+7), `yyyyMMddHHmmss`.
pub fn format_date(at: DateTime<Utc>) -> String {
    (at + Duration::hours(7))
        .naive_utc()
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// Signed redirect URL that sends the payer to the VNPay payment page.
pub fn build_payment_url(
    config: &VnpayConfig,
    request: &PaymentRequest,
    client_ip: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<String, PaymentError> {
    let mut params = Params::new();
    let mut set = |k: &str, v: String| {
        params.insert(k.to_string(), v);
    };
    set("vnp_Version", VERSION.to_string());
    set("vnp_Command", "pay".to_string());
    set("vnp_TmnCode", config.tmn_code.clone());
    set("vnp_Amount", request.amount.to_vnpay()?.to_string());
    set("vnp_CurrCode", "VND".to_string());
    set("vnp_TxnRef", request.order_id.to_string());
    set("vnp_OrderInfo", request.order_info.clone());
    set("vnp_OrderType", "other".to_string());
    set("vnp_Locale", "vn".to_string());
    set("vnp_ReturnUrl", request.return_url.clone());
    set("vnp_IpAddr", client_ip.to_string());
    set("vnp_CreateDate", format_date(now));
    set("vnp_ExpireDate", format_date(expires_at));

    let query = VNPAY_SORTED.canonicalize(&params);
    let hash = config.signer.sign_bytes(query.as_bytes());
    Ok(format!("{}?{query}&{SECURE_HASH}={hash}", config.pay_url))
}

fn required<'a>(params: &'a Params, key: &str) -> Result<&'a str, PaymentError> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::Validation(format!("missing {key}")))
}

/// Map return-URL or IPN parameters to a callback. The signature must have
/// been checked on the same `params` first.
pub fn parse_callback(
    params: &Params,
    source_ip: Option<String>,
) -> Result<PaymentCallback, PaymentError> {
    let result_code = required(params, "vnp_ResponseCode")?.to_string();
    let outcome = PaymentOutcome::from_vnpay(
        &result_code,
        params.get("vnp_TransactionStatus").map(String::as_str),
    );

    Ok(PaymentCallback {
        provider: Provider::Vnpay,
        order_id: OrderId::new(required(params, "vnp_TxnRef")?)?,
        trans_id: TransId::new(required(params, "vnp_TransactionNo")?)?,
        result_code,
        outcome,
        amount: Amount::from_vnpay(required(params, "vnp_Amount")?)?,
        message: params.get("vnp_OrderInfo").cloned().unwrap_or_default(),
        response_time: params.get("vnp_PayDate").cloned().unwrap_or_default(),
        signature: params.get(SECURE_HASH).cloned().unwrap_or_default(),
        source_ip,
    })
}
