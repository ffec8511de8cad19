//! authd CLI 分发：`run`、`hash-password`、`doctor`、`version`。

use std::io::BufRead;

use anyhow::{Context, anyhow, bail};
use serde_json::json;

use crate::{auth::credentials::hash_password, config::Config};

/// CLI 分发结果。
pub(crate) enum CliDispatch {
    /// 继续进入服务主循环。
    Run,
    /// 命令已处理完成，主程序应退出。
    Exit,
}

/// 解析并执行 authd CLI。
pub(crate) fn dispatch(args: &[String]) -> anyhow::Result<CliDispatch> {
    if args.is_empty() {
        return Ok(CliDispatch::Run);
    }

    let cmd = args[0].trim();
    if cmd.is_empty() || cmd == "run" {
        return Ok(CliDispatch::Run);
    }

    if matches!(cmd, "-h" | "--help" | "help") {
        print_root_help();
        return Ok(CliDispatch::Exit);
    }

    match cmd {
        "hash-password" => {
            let password = match args.get(1) {
                Some(value) => value.clone(),
                None => read_password_line()?,
            };
            if password.is_empty() {
                bail!("password must not be empty");
            }
            println!("{}", hash_password(&password)?);
            Ok(CliDispatch::Exit)
        }
        "doctor" => {
            let format = parse_doctor_format(&args[1..])?;
            run_doctor(format);
            Ok(CliDispatch::Exit)
        }
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(CliDispatch::Exit)
        }
        other => Err(anyhow!(
            "unknown command: {other}; run `sa-authd --help` for usage"
        )),
    }
}

/// `doctor` 输出格式。
#[derive(Debug, PartialEq, Eq)]
enum DoctorFormat {
    Text,
    Json,
}

/// 解析 doctor 的 `--format` 参数。
fn parse_doctor_format(args: &[String]) -> anyhow::Result<DoctorFormat> {
    if args.is_empty() {
        return Ok(DoctorFormat::Text);
    }
    if args.len() == 2 && args[0] == "--format" {
        return match args[1].as_str() {
            "text" => Ok(DoctorFormat::Text),
            "json" => Ok(DoctorFormat::Json),
            other => Err(anyhow!("unsupported doctor format: {other}")),
        };
    }
    Err(anyhow!("usage: sa-authd doctor [--format text|json]"))
}

/// 打印脱敏后的配置；配置无效时以非零码退出。
fn run_doctor(format: DoctorFormat) {
    let loaded = Config::from_env();

    match (&format, &loaded) {
        (DoctorFormat::Text, Ok(config)) => {
            println!("config: ok");
            println!("addr: {}", config.addr);
            println!("token-ttl-sec: {}", config.token_ttl_sec);
            println!("max-concurrent-logins: {}", config.max_concurrent_logins);
            println!(
                "users: {}",
                config
                    .users_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "<demo>".to_string())
            );
            println!(
                "secret: {}",
                if config.secret_is_weak() { "weak" } else { "ok" }
            );
        }
        (DoctorFormat::Text, Err(err)) => {
            println!("config: invalid");
            println!("error: {err:#}");
        }
        (DoctorFormat::Json, Ok(config)) => {
            let payload = json!({ "ok": true, "config": config.redacted_json() });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
            );
        }
        (DoctorFormat::Json, Err(err)) => {
            let payload = json!({ "ok": false, "error": format!("{err:#}") });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }

    if loaded.is_err() {
        std::process::exit(1);
    }
}

/// 未给出参数时从 stdin 读取一行密码。
fn read_password_line() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// 打印 root help。
fn print_root_help() {
    println!("sa-authd usage:");
    println!("  sa-authd run");
    println!("  sa-authd hash-password [password]   (reads stdin when omitted)");
    println!("  sa-authd doctor [--format text|json]");
    println!("  sa-authd version");
    println!();
    println!("environment:");
    println!("  SECRET_KEY            token signing secret (required)");
    println!("  AUTHD_ADDR            listen address (default 0.0.0.0:5000)");
    println!("  AUTHD_TOKEN_TTL_SEC   token lifetime in seconds (default 86400)");
    println!("  AUTHD_USERS_PATH      users file; demo credentials when unset");
    println!("  AUTHD_MAX_CONCURRENT_LOGINS  concurrent password checks (default 8)");
}
