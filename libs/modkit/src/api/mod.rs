pub mod problem;
pub mod request;
