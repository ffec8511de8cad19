//! 响应体构造：成功走 `OkEnvelope`，失败统一序列化为协议层 `ErrorBody`。

use axum::Json;
use sa_shared_protocol::ErrorBody;
use serde::Serialize;

/// 成功响应包裹，字段与 `ErrorBody` 对齐并附带 `data`。
#[derive(Debug, Serialize)]
pub(crate) struct OkEnvelope<T>
where
    T: Serialize,
{
    ok: bool,
    code: &'static str,
    message: &'static str,
    suggestion: &'static str,
    data: T,
}

/// 构造成功响应。
pub(crate) fn ok_envelope<T: Serialize>(
    message: &'static str,
    suggestion: &'static str,
    data: T,
) -> Json<OkEnvelope<T>> {
    Json(OkEnvelope {
        ok: true,
        code: "OK",
        message,
        suggestion,
        data,
    })
}

/// 构造失败响应体。
pub(crate) fn error_body(code: &str, message: String, suggestion: &str) -> ErrorBody {
    ErrorBody {
        ok: false,
        code: code.to_string(),
        message,
        suggestion: suggestion.to_string(),
    }
}
