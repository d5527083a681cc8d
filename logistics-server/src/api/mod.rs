//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 认证相关接口
//! - [`vendors`] - 商户管理接口
//! - [`warehouses`] - 仓库管理接口
//! - [`fares`] - 运价管理接口
//! - [`orders`] - 订单管理接口
//! - [`shipments`] - 运单管理接口
//! - [`reports`] - 报表导出接口
//! - [`dashboard`] - 统计看板接口
//! - [`activity_logs`] - 活动日志接口
//! - [`queue`] - 队列状态接口

pub mod activity_logs;
pub mod auth;
pub mod dashboard;
pub mod fares;
pub mod health;
pub mod orders;
pub mod queue;
pub mod reports;
pub mod shipments;
pub mod vendors;
pub mod warehouses;

// Re-export common types for handlers
pub use crate::utils::{ApiResponse, AppResult};
