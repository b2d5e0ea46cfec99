pub mod billing_interval;
pub mod read_model;
pub mod revenue_share;
pub mod risk_state;
pub mod subscription;
pub mod transaction;
