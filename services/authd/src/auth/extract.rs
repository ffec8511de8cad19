//! Bearer token 提取器：校验通过后向处理函数暴露只读 claims。

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use sa_shared_protocol::Claims;
use tracing::debug;

use crate::{api::error::ApiError, auth::error::AuthError, state::AppState};

/// 已校验的 claims。处理函数参数里声明即要求鉴权。
#[derive(Debug, Clone)]
pub(crate) struct AuthClaims(pub(crate) Claims);

impl FromRequestParts<AppState> for AuthClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.signer.verify(token).inspect_err(|err| {
            debug!(code = err.code(), path = %parts.uri.path(), "bearer rejected");
        })?;
        Ok(Self(claims))
    }
}

/// 从 `Authorization` 头取出 bearer token；头缺失、为空或非 Bearer 方案都视为缺少 token。
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(raw) = headers.get(AUTHORIZATION) else {
        return Err(AuthError::MissingToken);
    };
    let value = raw.to_str().map_err(|_| AuthError::MalformedToken)?.trim();
    let Some((scheme, token)) = value.split_once(char::is_whitespace) else {
        return Err(AuthError::MissingToken);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
