//! HTTP 接口公共层：错误、响应包裹与接口类型。

pub(crate) mod error;
pub(crate) mod response;
pub(crate) mod types;
