//! Concrete adapter implementations for ports.

pub mod json_cache_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
