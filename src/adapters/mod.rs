pub mod ack;
pub mod api_errors;
pub mod http;
pub mod momo;
pub mod vnpay;
