//! 鉴权失败类型。

use axum::http::StatusCode;
use thiserror::Error;

/// 单次请求内的鉴权失败；均不影响进程本身。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum AuthError {
    #[error("用户名或密码错误")]
    AuthenticationFailed,
    #[error("缺少 bearer token")]
    MissingToken,
    #[error("token 格式无效")]
    MalformedToken,
    #[error("token 签名校验失败")]
    InvalidSignature,
    #[error("token 已过期")]
    Expired,
    #[error("权限不足")]
    InsufficientPermissions,
}

impl AuthError {
    /// 对外错误码。
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedToken => "INVALID_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
        }
    }

    /// 对应 HTTP 状态码：权限不足为 403，其余均为 401。
    pub(crate) fn status(self) -> StatusCode {
        match self {
            Self::InsufficientPermissions => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// 给调用方的处理建议。
    pub(crate) fn suggestion(self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "请检查用户名和密码",
            Self::MissingToken => "请在 Authorization 头中携带 Bearer token",
            Self::MalformedToken | Self::InvalidSignature => "请重新登录获取 token",
            Self::Expired => "token 已失效，请重新登录",
            Self::InsufficientPermissions => "请使用具备相应角色的账号",
        }
    }
}
