// Concrete implementations of the ports in domain::ports.

pub mod google;
pub mod oauth;
pub mod portal;
pub mod storage;
