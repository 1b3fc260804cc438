use {
    crate::{
        AppState,
        adapters::{
            ack::{MomoAck, VnpayAck},
            api_errors::ApiError,
            momo::{self, MomoNotification},
            vnpay,
        },
        domain::{
            error::PaymentError,
            id::OrderId,
            order::OrderStatus,
            payment::{PaymentRequest, Provider, ReconcileOutcome},
        },
        signing::canonical::{Params, VNPAY_SORTED},
    },
    axum::{
        Json, Router,
        extract::{
            ConnectInfo, DefaultBodyLimit, Path, Query, Request, State,
            rejection::{JsonRejection, QueryRejection},
        },
        http::{HeaderMap, header},
        middleware::{self, Next},
        response::{IntoResponse, Redirect, Response},
        routing::{get, post},
    },
    serde::{Deserialize, Serialize},
    std::{net::SocketAddr, time::Duration},
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
    uuid::Uuid,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn router(state: AppState) -> Router {
    let operator = Router::new()
        .route("/payments/refund", post(refund))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/payments/{provider}/checkout", post(checkout))
        .route("/payments/vnpay/return", get(vnpay_return))
        .route("/payments/vnpay/ipn", get(vnpay_ipn))
        .route("/payments/momo/return", get(momo_return))
        .route("/payments/momo/ipn", post(momo_ipn))
        .merge(operator)
        .layer(DefaultBodyLimit::max(16 * 1024))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rejects operator requests without `Authorization: Bearer <ADMIN_API_TOKEN>`.
async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .zip(state.config.admin_token.as_ref())
        .is_some_and(|(presented, token)| token.matches(presented.trim()));

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "operator request rejected");
        return Err(PaymentError::Unauthorized.into());
    }
    Ok(next.run(request).await)
}

/// Peer address, or the address our proxy appended to `X-Forwarded-For`
/// (the right-most entry) when the service runs behind a trusted proxy.
/// Entries to its left come from the client and are ignored.
fn client_ip(state: &AppState, peer: SocketAddr, headers: &HeaderMap) -> String {
    if state.config.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub order_id: OrderId,
    pub order_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub pay_url: String,
    pub provider: Provider,
    pub order_id: OrderId,
}

#[tracing::instrument(name = "checkout", skip_all, fields(provider = %provider, order_id = %body.order_id))]
async fn checkout(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(provider): Path<String>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let provider = Provider::try_from(provider.as_str())?;
    let order = state
        .reconciler
        .store()
        .find_by_id(&body.order_id)
        .await?
        .ok_or_else(|| PaymentError::OrderNotFound(body.order_id.to_string()))?;

    let now = state.reconciler.clock().now();
    if order.status != OrderStatus::Pending || order.is_expired_at(now) {
        return Err(PaymentError::OrderStateConflict {
            order_id: order.id.to_string(),
            current: if order.status == OrderStatus::Pending {
                OrderStatus::Expired
            } else {
                order.status
            },
        }
        .into());
    }

    let order_info = body
        .order_info
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("Thanh toan don hang {}", order.id));

    let pay_url = match provider {
        Provider::Vnpay => {
            let cfg = &state.config.vnpay;
            let request = PaymentRequest {
                provider,
                order_id: order.id.clone(),
                amount: order.amount,
                order_info,
                return_url: cfg.return_url.clone(),
                notify_url: String::new(),
                request_id: order.id.to_string(),
                extra_data: String::new(),
            };
            let ip = client_ip(&state, peer, &headers);
            vnpay::build_payment_url(cfg, &request, &ip, now, order.expires_at)?
        }
        Provider::Momo => {
            let cfg = state.momo.config();
            let request = PaymentRequest {
                provider,
                order_id: order.id.clone(),
                amount: order.amount,
                order_info,
                return_url: cfg.redirect_url.clone(),
                notify_url: cfg.ipn_url.clone(),
                request_id: Uuid::now_v7().to_string(),
                extra_data: String::new(),
            };
            state.momo.create_payment(&request).await?
        }
    };

    tracing::info!("checkout created");
    Ok(Json(CheckoutResponse {
        pay_url,
        provider,
        order_id: order.id,
    }))
}

/// Where the payer lands after a redirect. Only a coarse status is exposed.
fn result_redirect(
    state: &AppState,
    result: &Result<ReconcileOutcome, PaymentError>,
    order_id: Option<&str>,
) -> Redirect {
    let status = match result {
        Ok(ReconcileOutcome::Applied(OrderStatus::Paid))
        | Ok(ReconcileOutcome::Duplicate(OrderStatus::Paid)) => "success",
        Ok(ReconcileOutcome::StillPending) => "pending",
        _ => "failed",
    };
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("status", status)
        .append_pair("order_id", order_id.unwrap_or_default())
        .finish();
    Redirect::to(&format!("{}/payment/result?{query}", state.config.frontend_url))
}

async fn vnpay_return(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Redirect {
    let order_id = params.get("vnp_TxnRef").cloned();
    let result = async {
        let signature = params.get(vnpay::SECURE_HASH).map(String::as_str);
        if !state.config.vnpay.signer.verify(&params, signature, &VNPAY_SORTED) {
            tracing::warn!(order_id = order_id.as_deref(), "VNPay return signature mismatch");
            return Err(PaymentError::InvalidSignature);
        }
        let callback = vnpay::parse_callback(&params, Some(client_ip(&state, peer, &headers)))?;
        state.reconciler.reconcile(&callback).await
    }
    .await;
    result_redirect(&state, &result, order_id.as_deref())
}

#[tracing::instrument(name = "vnpay_ipn", skip_all)]
async fn vnpay_ipn(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<Params>, QueryRejection>,
) -> Json<VnpayAck> {
    let Ok(Query(params)) = query else {
        tracing::warn!("unparseable VNPay IPN query");
        return Json(VnpayAck::new("99", "Invalid request"));
    };
    let source_ip = client_ip(&state, peer, &headers);
    let result = async {
        let signature = params.get(vnpay::SECURE_HASH).map(String::as_str);
        state
            .vnpay_ipn
            .authenticate(&source_ip, &params, signature)?;
        let callback = vnpay::parse_callback(&params, Some(source_ip.clone()))?;
        state.reconciler.reconcile(&callback).await
    }
    .await;

    if let Err(e) = &result {
        tracing::warn!(error = %e, "VNPay IPN not applied");
    }
    Json(VnpayAck::from_result(&result))
}

async fn momo_return(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(mut params): Query<Params>,
) -> Redirect {
    let order_id = params.get("orderId").cloned();
    let cfg = state.momo.config();
    params.insert("accessKey".to_string(), cfg.access_key.clone());
    let result = async {
        let signature = params.get("signature").map(String::as_str);
        if !cfg.signer.verify(&params, signature, &momo::CALLBACK_RULE) {
            tracing::warn!(order_id = order_id.as_deref(), "MoMo return signature mismatch");
            return Err(PaymentError::InvalidSignature);
        }
        let callback = momo::parse_callback(&params, Some(client_ip(&state, peer, &headers)))?;
        state.reconciler.reconcile(&callback).await
    }
    .await;
    result_redirect(&state, &result, order_id.as_deref())
}

#[tracing::instrument(name = "momo_ipn", skip_all)]
async fn momo_ipn(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<MomoNotification>, JsonRejection>,
) -> Json<MomoAck> {
    let notification = match body {
        Ok(Json(n)) => n,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "unparseable MoMo IPN body");
            return Json(MomoAck::new(99, "Invalid request"));
        }
    };
    let source_ip = client_ip(&state, peer, &headers);
    let params = notification.to_params(&state.momo.config().access_key);
    let result = async {
        state
            .momo_ipn
            .authenticate(&source_ip, &params, Some(&notification.signature))?;
        let callback = momo::parse_callback(&params, Some(source_ip.clone()))?;
        state.reconciler.reconcile(&callback).await
    }
    .await;

    if let Err(e) = &result {
        tracing::warn!(error = %e, "MoMo IPN not applied");
    }
    Json(MomoAck::from_result(&result))
}

#[derive(Debug, Deserialize)]
pub struct RefundBody {
    pub order_id: OrderId,
}

#[tracing::instrument(name = "refund_request", skip_all, fields(order_id = %body.order_id))]
async fn refund(
    State(state): State<AppState>,
    Json(body): Json<RefundBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.refunder.refund(&body.order_id).await?;
    let status = match outcome {
        ReconcileOutcome::Applied(_) => "refunded",
        ReconcileOutcome::Duplicate(_) => "duplicate",
        ReconcileOutcome::StillPending | ReconcileOutcome::Ignored(_) => "ignored",
    };
    Ok(Json(serde_json::json!({
        "status": status,
        "order_id": body.order_id,
    })))
}
