use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化日志（RUST_LOG 优先，默认 info）
///
/// 重复调用时静默忽略
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
