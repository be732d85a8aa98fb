pub mod analysis;
pub mod compile;
pub mod config;
pub mod errors;
pub mod extract;
pub mod intake;
pub mod llm_client;
pub mod render;
pub mod routes;
pub mod state;
