//! 接口类型与服务级常量。

use serde::Serialize;

/// 服务名，用于首页与日志文件名。
pub(crate) const SERVICE_NAME: &str = "sa-authd";

/// 首页返回数据。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexData {
    pub(crate) service: &'static str,
    pub(crate) version: &'static str,
}

impl IndexData {
    pub(crate) fn current() -> Self {
        Self {
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
