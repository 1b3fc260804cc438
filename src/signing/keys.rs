//! Field orders for MoMo signatures, as published in the MoMo v2 gateway
//! documentation. Each call type signs a different field list; the order here
//! is the wire contract, so never derive it from struct or map iteration.

/// A named, versioned list of fields to sign, in signing order.
#[derive(Debug, PartialEq, Eq)]
pub struct KeyOrder {
    pub name: &'static str,
    pub version: &'static str,
    pub keys: &'static [&'static str],
}

pub const MOMO_CREATE: KeyOrder = KeyOrder {
    name: "momo.create",
    version: "v2",
    keys: &[
        "accessKey",
        "amount",
        "extraData",
        "ipnUrl",
        "orderId",
        "orderInfo",
        "partnerCode",
        "redirectUrl",
        "requestId",
        "requestType",
    ],
};

pub const MOMO_CREATE_RESPONSE: KeyOrder = KeyOrder {
    name: "momo.create_response",
    version: "v2",
    keys: &[
        "accessKey",
        "amount",
        "message",
        "orderId",
        "partnerCode",
        "payUrl",
        "requestId",
        "responseTime",
        "resultCode",
    ],
};

/// Browser redirect back to `redirectUrl`.
pub const MOMO_CALLBACK: KeyOrder = KeyOrder {
    name: "momo.callback",
    version: "v2",
    keys: &[
        "accessKey",
        "amount",
        "extraData",
        "message",
        "orderId",
        "orderInfo",
        "orderType",
        "partnerCode",
        "payType",
        "requestId",
        "responseTime",
        "resultCode",
        "transId",
    ],
};

/// Server-to-server notification to `ipnUrl`.
pub const MOMO_IPN: KeyOrder = KeyOrder {
    name: "momo.ipn",
    version: "v2",
    keys: &[
        "accessKey",
        "amount",
        "extraData",
        "message",
        "orderId",
        "orderInfo",
        "orderType",
        "partnerCode",
        "payType",
        "requestId",
        "responseTime",
        "resultCode",
        "transId",
    ],
};

pub const MOMO_REFUND: KeyOrder = KeyOrder {
    name: "momo.refund",
    version: "v2",
    keys: &[
        "accessKey",
        "amount",
        "description",
        "orderId",
        "partnerCode",
        "requestId",
        "transId",
    ],
};
