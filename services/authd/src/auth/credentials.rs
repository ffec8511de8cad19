//! 凭证存储：启动时固定，运行期只读。

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, anyhow, bail};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sa_shared_protocol::{ROLE_ADMIN, ROLE_USER};
use serde::Deserialize;
use tracing::warn;

use crate::auth::error::AuthError;

/// 演示账号用户名。
pub(crate) const DEMO_USERNAME: &str = "admin";
/// 演示账号密码。
pub(crate) const DEMO_PASSWORD: &str = "secure_password";

/// 单条凭证记录。
#[derive(Debug, Clone)]
pub(crate) struct CredentialRecord {
    pub(crate) username: String,
    /// argon2 PHC 字符串。
    pub(crate) password_hash: String,
    pub(crate) roles: Vec<String>,
}

/// 登录成功后的身份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub(crate) user_id: String,
    pub(crate) roles: Vec<String>,
}

/// 用户文件结构。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersFile {
    users: Vec<UserEntry>,
}

/// 用户文件中的单个用户。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
    username: String,
    password_hash: String,
    #[serde(default)]
    roles: Option<Vec<String>>,
}

/// 不可变凭证表。
#[derive(Debug)]
pub(crate) struct CredentialStore {
    users: HashMap<String, CredentialRecord>,
    /// 未知用户也走一次校验，避免通过耗时区分用户名是否存在。
    dummy_hash: String,
}

impl CredentialStore {
    /// 由记录列表构造，校验用户名唯一与哈希格式。
    pub(crate) fn from_records(records: Vec<CredentialRecord>) -> anyhow::Result<Self> {
        let mut users = HashMap::with_capacity(records.len());
        for record in records {
            let username = record.username.trim().to_string();
            if username.is_empty() {
                bail!("credential record has empty username");
            }
            PasswordHash::new(&record.password_hash)
                .map_err(|err| anyhow!("invalid password hash for {username}: {err}"))?;
            if users.contains_key(&username) {
                bail!("duplicate username in credential store: {username}");
            }
            users.insert(
                username.clone(),
                CredentialRecord {
                    username,
                    password_hash: record.password_hash,
                    roles: record.roles,
                },
            );
        }
        Ok(Self {
            users,
            dummy_hash: hash_password("dummy-password-for-unknown-users")?,
        })
    }

    /// 内置演示账号 `admin` / `secure_password`。
    pub(crate) fn demo() -> anyhow::Result<Self> {
        Self::from_records(vec![CredentialRecord {
            username: DEMO_USERNAME.to_string(),
            password_hash: hash_password(DEMO_PASSWORD)?,
            roles: vec![ROLE_ADMIN.to_string()],
        }])
    }

    /// 从 JSON 用户文件加载。
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("read users file: {}", path.display()))?;
        let parsed: UsersFile = serde_json::from_slice(&raw)
            .with_context(|| format!("decode users file: {}", path.display()))?;
        let records = parsed
            .users
            .into_iter()
            .map(|entry| CredentialRecord {
                username: entry.username,
                password_hash: entry.password_hash,
                roles: entry
                    .roles
                    .unwrap_or_else(|| vec![ROLE_USER.to_string()]),
            })
            .collect();
        Self::from_records(records)
    }

    /// 按配置选择来源：有用户文件则加载，否则回退演示账号。
    pub(crate) fn from_users_path(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                warn!(
                    "no users file configured, demo credentials `{DEMO_USERNAME}` are active"
                );
                Self::demo()
            }
        }
    }

    /// 用户数量。
    pub(crate) fn len(&self) -> usize {
        self.users.len()
    }

    /// 校验用户名/密码；CPU 密集，异步上下文中应放到 blocking 线程执行。
    pub(crate) fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(record) = self.users.get(username) else {
            let _ = verify_password(password, &self.dummy_hash);
            return Err(AuthError::AuthenticationFailed);
        };
        if !verify_password(password, &record.password_hash) {
            return Err(AuthError::AuthenticationFailed);
        }
        Ok(Identity {
            user_id: record.username.clone(),
            roles: record.roles.clone(),
        })
    }
}

/// 生成 argon2id 哈希（PHC 字符串）。
pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("hash password failed: {err}"))?;
    Ok(hash.to_string())
}

/// 校验密码；哈希无法解析时按不匹配处理。
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
