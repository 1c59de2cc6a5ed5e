pub mod delay;
pub mod http;
