//! Port traits at the boundary of the domain.

pub mod config_port;
pub mod execution_port;
pub mod market_data_port;
pub mod report_port;
