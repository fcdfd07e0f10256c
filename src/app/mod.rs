pub mod encoding;
pub mod interpret;
pub mod ports;
pub mod submit_use_case;
