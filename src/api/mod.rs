pub mod gamebanana;
pub mod transport;
