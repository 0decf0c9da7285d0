pub mod consultation;
pub mod session;
