pub mod chunks;
pub mod gateway;
pub mod parser;
pub mod pipeline;
pub mod prompt;
