//! 鉴权 HTTP 接口处理。

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use sa_shared_protocol::{
    AdminResponse, LoginRequest, LoginResponse, ProtectedResponse, ROLE_ADMIN, rfc3339_from_unix,
    unix_now,
};
use tracing::{info, warn};

use crate::{
    api::error::ApiError,
    auth::{error::AuthError, extract::AuthClaims},
    state::AppState,
};

/// 登录接口：校验凭证并签发 token。
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload.map_err(|err| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            format!("请求体无效: {}", err.body_text()),
            "请提交 JSON 格式的 username 与 password",
        )
    })?;

    // 用户名按原样精确匹配，不做归一化。
    let username = req.username;
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_CREDENTIALS",
            "username 与 password 均为必填",
            "请检查输入后重试",
        ));
    }

    let identity = state
        .authenticate(username.clone(), req.password)
        .await
        .inspect_err(|err| warn!(username = %username, code = err.code, "login rejected"))?;

    let issued = state
        .signer
        .issue(&identity.user_id, &identity.roles)
        .map_err(ApiError::internal)?;
    info!(
        user_id = %issued.claims.user_id,
        jti = %issued.claims.jti,
        expires_at = %rfc3339_from_unix(issued.claims.exp),
        "token issued"
    );

    Ok(Json(LoginResponse {
        access_token: issued.token,
        expires_in: issued.claims.remaining_sec(issued.claims.iat),
    }))
}

/// 受保护资源：回显已校验的 claims。
pub(crate) async fn protected_handler(AuthClaims(claims): AuthClaims) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        claims,
        message: "success".to_string(),
    })
}

/// 管理员接口：要求 `admin` 角色。
pub(crate) async fn admin_handler(
    AuthClaims(claims): AuthClaims,
) -> Result<Json<AdminResponse>, ApiError> {
    if !claims.has_any_role(&[ROLE_ADMIN]) {
        warn!(user_id = %claims.user_id, "admin endpoint denied");
        return Err(AuthError::InsufficientPermissions.into());
    }
    info!(
        user_id = %claims.user_id,
        remaining_sec = claims.remaining_sec(unix_now()),
        "admin endpoint reached"
    );
    Ok(Json(AdminResponse {
        message: "admin endpoint reached".to_string(),
    }))
}
