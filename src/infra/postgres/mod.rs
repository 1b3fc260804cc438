pub mod audit_repo;
pub mod enrollment_repo;
pub mod order_repo;
