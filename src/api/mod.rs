//! HTTP 服务层
//!
//! 公共只读/采集 API，无认证；采集端点带每 IP 限流。

pub mod server;
pub mod services;
