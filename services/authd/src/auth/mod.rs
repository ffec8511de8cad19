//! 鉴权模块：凭证校验、token 签发/校验、bearer 提取与 HTTP 处理。

pub(crate) mod credentials;
pub(crate) mod error;
pub(crate) mod extract;
pub(crate) mod handlers;
pub(crate) mod token;
