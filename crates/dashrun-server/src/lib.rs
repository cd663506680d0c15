pub mod config;
pub mod race_loop;
pub mod rate_limit;
