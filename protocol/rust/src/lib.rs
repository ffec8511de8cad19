// 文件职责：
// 1) 定义 authd 服务与调用方共用的协议数据结构（登录请求/响应、claims、错误体）。
// 2) 提供 unix 秒时间戳与 RFC3339 转换等跨端一致的基础函数。
// 3) 作为 Rust 侧协议唯一代码源，供服务端与测试复用。

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 管理员角色名。
pub const ROLE_ADMIN: &str = "admin";
/// 普通用户角色名。
pub const ROLE_USER: &str = "user";

/// 已校验 token 的载荷。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    // 用户标识（登录用户名）。
    pub user_id: String,
    // 角色集合（去重，保持颁发顺序）。
    pub roles: Vec<String>,
    // 颁发时间（unix 秒）。
    pub iat: u64,
    // 过期时间（unix 秒）。
    pub exp: u64,
    // token 唯一 ID。
    pub jti: String,
}

impl Claims {
    /// 是否持有指定角色。
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|item| item == role)
    }

    /// 是否持有任一角色；`wanted` 为空时视为无角色要求。
    pub fn has_any_role(&self, wanted: &[&str]) -> bool {
        wanted.is_empty() || wanted.iter().any(|role| self.has_role(role))
    }

    /// 在 `now` 时刻是否已过期（`exp` 当秒即失效）。
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }

    /// 距离过期的剩余秒数。
    pub fn remaining_sec(&self, now: u64) -> u64 {
        self.exp.saturating_sub(now)
    }
}

/// 登录请求。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// 登录成功响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    // 已签名的 bearer token。
    pub access_token: String,
    // token 剩余有效期（秒）。
    pub expires_in: u64,
}

/// 受保护资源响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResponse {
    pub claims: Claims,
    pub message: String,
}

/// 管理员接口响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResponse {
    pub message: String,
}

/// 统一错误体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub code: String,
    pub message: String,
    pub suggestion: String,
}

/// 当前 unix 秒。
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// unix 秒转 RFC3339（秒精度）；超出 chrono 可表示范围时返回空串。
pub fn rfc3339_from_unix(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{Claims, LoginRequest, rfc3339_from_unix};

    fn claims(roles: &[&str]) -> Claims {
        Claims {
            user_id: "admin".to_string(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
            iat: 100,
            exp: 200,
            jti: "0123456789abcdef0123456789abcdef".to_string(),
        }
    }

    #[test]
    fn role_checks_match_any_wanted_role() {
        let admin = claims(&["admin", "user"]);
        assert!(admin.has_role("admin"));
        assert!(admin.has_any_role(&["ops", "admin"]));
        assert!(admin.has_any_role(&[]));

        let user = claims(&["user"]);
        assert!(!user.has_any_role(&["admin"]));
    }

    #[test]
    fn expiry_is_inclusive_of_exp_second() {
        let c = claims(&[]);
        assert!(!c.is_expired_at(199));
        assert!(c.is_expired_at(200));
        assert_eq!(c.remaining_sec(150), 50);
        assert_eq!(c.remaining_sec(500), 0);
    }

    #[test]
    fn claims_serialize_with_snake_case_fields() {
        let value = serde_json::to_value(claims(&["admin"])).unwrap();
        assert_eq!(value["user_id"], "admin");
        assert_eq!(value["roles"], serde_json::json!(["admin"]));
        assert_eq!(value["exp"], 200);
    }

    #[test]
    fn login_request_missing_fields_default_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"username":"admin"}"#).unwrap();
        assert_eq!(req.username, "admin");
        assert!(req.password.is_empty());
    }

    #[test]
    fn rfc3339_formats_unix_seconds() {
        assert_eq!(rfc3339_from_unix(0), "1970-01-01T00:00:00Z");
    }
}
