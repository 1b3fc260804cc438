pub mod reconciler;
pub mod refund;
pub mod sweep;
