pub mod handlers;
pub mod saves;
pub mod service;
pub mod stats;
