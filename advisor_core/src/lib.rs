pub mod config;
pub mod context;
pub mod conversation;
pub mod extraction;
pub mod http_client;
pub mod llm_client;
pub mod message;
pub mod profile;
pub mod relay;
pub mod relay_client;
pub mod storage;
