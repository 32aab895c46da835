pub mod config;
pub mod mod_info;
pub mod sync_state;
