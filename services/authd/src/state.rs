//! 服务共享状态：凭证表、签名器与密码校验并发闸门，启动后只读。

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{
    api::error::ApiError,
    auth::{
        credentials::{CredentialStore, Identity},
        token::TokenSigner,
    },
    config::Config,
};

/// 请求间共享的只读状态。
#[derive(Clone)]
pub(crate) struct AppState {
    /// 启动时固定的凭证表。
    pub(crate) credentials: Arc<CredentialStore>,
    /// 持有签名密钥的 token 签发/校验器。
    pub(crate) signer: Arc<TokenSigner>,
    /// 限制同时在 blocking 线程上运行的 argon2 校验数。
    pub(crate) login_permits: Arc<Semaphore>,
}

impl AppState {
    pub(crate) fn new(
        credentials: CredentialStore,
        signer: TokenSigner,
        max_concurrent_logins: usize,
    ) -> Self {
        Self {
            credentials: Arc::new(credentials),
            signer: Arc::new(signer),
            login_permits: Arc::new(Semaphore::new(max_concurrent_logins.max(1))),
        }
    }

    /// 按配置装配状态：加载凭证表并以配置中的密钥构造签名器。
    pub(crate) fn from_config(config: &Config) -> anyhow::Result<Self> {
        let credentials = CredentialStore::from_users_path(config.users_path.as_deref())?;
        let signer = TokenSigner::new(&config.secret_key, config.token_ttl_sec)?;
        Ok(Self::new(credentials, signer, config.max_concurrent_logins))
    }

    /// 取得校验许可后在 blocking 线程上校验凭证；许可随校验结束释放。
    pub(crate) async fn authenticate(
        &self,
        username: String,
        password: String,
    ) -> Result<Identity, ApiError> {
        let permit = Arc::clone(&self.login_permits)
            .acquire_owned()
            .await
            .map_err(ApiError::internal)?;
        let store = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            store.authenticate(&username, &password)
        })
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::AppState;
    use crate::auth::{
        credentials::{CredentialStore, DEMO_PASSWORD, DEMO_USERNAME},
        token::TokenSigner,
    };

    fn state(max_concurrent_logins: usize) -> AppState {
        AppState::new(
            CredentialStore::demo().unwrap(),
            TokenSigner::new("state-test-secret-0123456789abcdef", 60).unwrap(),
            max_concurrent_logins,
        )
    }

    #[tokio::test]
    async fn login_waits_while_all_permits_are_held() {
        let state = state(1);
        let held = Arc::clone(&state.login_permits).acquire_owned().await.unwrap();

        let pending = tokio::time::timeout(
            Duration::from_millis(200),
            state.authenticate(DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string()),
        )
        .await;
        assert!(pending.is_err(), "login must not run without a permit");

        drop(held);
        let identity = state
            .authenticate(DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string())
            .await
            .unwrap();
        assert_eq!(identity.user_id, "admin");
    }

    #[tokio::test]
    async fn permits_are_released_after_each_login() {
        let state = state(2);
        for password in [DEMO_PASSWORD, "wrong"] {
            let _ = state
                .authenticate(DEMO_USERNAME.to_string(), password.to_string())
                .await;
        }
        assert_eq!(state.login_permits.available_permits(), 2);
    }

    #[test]
    fn zero_limit_still_admits_one_login() {
        assert_eq!(state(0).login_permits.available_permits(), 1);
    }
}
