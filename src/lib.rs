//! DocFlow 实时通知客户端
//!
//! 连接管理器维护唯一的推送连接，通知仓库合并REST拉取结果与实时推送，
//! 通知面板把仓库状态转换为渲染模型。

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
