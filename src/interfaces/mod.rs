//! Adapters between the outside world and the application layer: the HTTP
//! callback endpoints and CSV files for replaying notifications and
//! reporting payments.

pub mod csv;
pub mod http;
