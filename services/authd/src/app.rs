//! authd 应用装配：路由、CORS、请求追踪与监听。

use axum::{
    Json, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    api::{
        response::{OkEnvelope, ok_envelope},
        types::IndexData,
    },
    auth::handlers::{admin_handler, login_handler, protected_handler},
    config::Config,
    state::AppState,
};

/// 入口：读取配置、装配状态并启动 HTTP 服务。
pub(crate) async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().inspect_err(|err| error!("invalid configuration: {err:#}"))?;
    if config.secret_is_weak() {
        warn!("signing secret is shorter than recommended, use at least 32 random bytes");
    }
    let state = AppState::from_config(&config)?;
    info!(
        users = state.credentials.len(),
        token_ttl_sec = state.signer.ttl_sec(),
        "credential store loaded"
    );

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!("authd listening on {}", config.addr);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("authd stopped");
    Ok(())
}

/// 构造路由。
pub(crate) fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/login", post(login_handler))
        .route("/protected", get(protected_handler))
        .route("/admin", get(admin_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// 首页：服务信息与使用提示。
async fn index() -> Json<OkEnvelope<IndexData>> {
    ok_envelope(
        "secure-auth api",
        "POST /login to get a token",
        IndexData::current(),
    )
}

/// 健康检查接口。
async fn healthz() -> &'static str {
    "ok"
}

/// 等待 Ctrl-C，用于优雅退出。
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("listen for shutdown signal failed: {err}");
        std::future::pending::<()>().await;
    }
}
