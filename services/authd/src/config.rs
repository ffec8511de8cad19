//! 配置模块职责：
//! 1. 启动时一次性读取环境变量，构造显式的 `Config` 传入各组件。
//! 2. 签名密钥缺失视为致命配置错误，进程拒绝启动。
//! 3. 提供脱敏的配置视图，供 `doctor` 与启动日志使用。

use std::{fmt, path::PathBuf};

use anyhow::{anyhow, bail};
use serde_json::{Value, json};

/// 签名密钥环境变量。
pub(crate) const SECRET_KEY_ENV: &str = "SECRET_KEY";
/// 监听地址环境变量。
const ADDR_ENV: &str = "AUTHD_ADDR";
/// token 有效期环境变量（秒）。
const TOKEN_TTL_ENV: &str = "AUTHD_TOKEN_TTL_SEC";
/// 用户文件路径环境变量。
const USERS_PATH_ENV: &str = "AUTHD_USERS_PATH";
/// 登录并发上限环境变量。
const MAX_CONCURRENT_LOGINS_ENV: &str = "AUTHD_MAX_CONCURRENT_LOGINS";
/// 默认监听地址。
pub(crate) const DEFAULT_ADDR: &str = "0.0.0.0:5000";
/// 默认 token 有效期：24 小时。
pub(crate) const DEFAULT_TOKEN_TTL_SEC: u64 = 86_400;
/// token 有效期上限：一年。
const MAX_TOKEN_TTL_SEC: u64 = 31_536_000;
/// 默认同时进行的密码校验数；每次 argon2 校验约占 19 MiB 内存。
pub(crate) const DEFAULT_MAX_CONCURRENT_LOGINS: usize = 8;
/// 密码校验并发上限的最大值。
const MAX_CONCURRENT_LOGINS_LIMIT: usize = 256;
/// 低于该字节数的密钥会在启动时告警。
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

/// 运行时配置。
#[derive(Clone)]
pub(crate) struct Config {
    /// HTTP 监听地址。
    pub(crate) addr: String,
    /// HS256 签名密钥。
    pub(crate) secret_key: String,
    /// token 有效期（秒）。
    pub(crate) token_ttl_sec: u64,
    /// 可选用户文件；缺省时使用演示账号。
    pub(crate) users_path: Option<PathBuf>,
    /// 同时进行的密码校验上限。
    pub(crate) max_concurrent_logins: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("secret_key", &"<redacted>")
            .field("token_ttl_sec", &self.token_ttl_sec)
            .field("users_path", &self.users_path)
            .field("max_concurrent_logins", &self.max_concurrent_logins)
            .finish()
    }
}

impl Config {
    /// 从进程环境变量构建配置。
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key 查找函数构建配置；空白值按未设置处理。
    pub(crate) fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let Some(secret_key) = read(SECRET_KEY_ENV) else {
            bail!("{SECRET_KEY_ENV} environment variable is required");
        };

        let token_ttl_sec = match read(TOKEN_TTL_ENV) {
            None => DEFAULT_TOKEN_TTL_SEC,
            Some(raw) => parse_ttl(&raw)?,
        };

        let max_concurrent_logins = match read(MAX_CONCURRENT_LOGINS_ENV) {
            None => DEFAULT_MAX_CONCURRENT_LOGINS,
            Some(raw) => parse_login_concurrency(&raw)?,
        };

        Ok(Self {
            addr: read(ADDR_ENV).unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            secret_key,
            token_ttl_sec,
            users_path: read(USERS_PATH_ENV).map(PathBuf::from),
            max_concurrent_logins,
        })
    }

    /// 密钥是否短于推荐长度。
    pub(crate) fn secret_is_weak(&self) -> bool {
        self.secret_key.len() < MIN_RECOMMENDED_SECRET_LEN
    }

    /// 脱敏后的配置视图。
    pub(crate) fn redacted_json(&self) -> Value {
        json!({
            "addr": self.addr,
            "secretKey": "<redacted>",
            "secretWeak": self.secret_is_weak(),
            "tokenTtlSec": self.token_ttl_sec,
            "usersPath": self.users_path.as_ref().map(|path| path.display().to_string()),
            "maxConcurrentLogins": self.max_concurrent_logins,
        })
    }
}

/// 解析 token 有效期，要求 `1..=MAX_TOKEN_TTL_SEC`。
fn parse_ttl(raw: &str) -> anyhow::Result<u64> {
    let ttl = raw
        .parse::<u64>()
        .map_err(|err| anyhow!("invalid {TOKEN_TTL_ENV} `{raw}`: {err}"))?;
    if ttl == 0 || ttl > MAX_TOKEN_TTL_SEC {
        bail!("{TOKEN_TTL_ENV} must be within 1..={MAX_TOKEN_TTL_SEC}, got {ttl}");
    }
    Ok(ttl)
}

/// 解析密码校验并发上限，要求 `1..=MAX_CONCURRENT_LOGINS_LIMIT`。
fn parse_login_concurrency(raw: &str) -> anyhow::Result<usize> {
    let limit = raw
        .parse::<usize>()
        .map_err(|err| anyhow!("invalid {MAX_CONCURRENT_LOGINS_ENV} `{raw}`: {err}"))?;
    if limit == 0 || limit > MAX_CONCURRENT_LOGINS_LIMIT {
        bail!(
            "{MAX_CONCURRENT_LOGINS_ENV} must be within 1..={MAX_CONCURRENT_LOGINS_LIMIT}, got {limit}"
        );
    }
    Ok(limit)
}
