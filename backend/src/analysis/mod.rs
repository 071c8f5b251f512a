pub mod history_service;
pub mod pipeline;
pub mod recommendation;
