// ==========================================
// 钢材采购优化系统 - 接口层
// ==========================================

pub mod optimization_api;

pub use optimization_api::{OptimizationApi, OptimizeRequest};
