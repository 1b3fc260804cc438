pub mod audit;
pub mod error;
pub mod id;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
