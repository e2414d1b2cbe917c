pub mod runs;
pub mod service_info;
