pub mod config;
pub mod replay;
pub mod score;
pub mod threshold;
