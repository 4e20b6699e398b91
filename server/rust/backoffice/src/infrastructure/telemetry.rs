use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use super::config::LogConfig;

/// init_tracing は tracing-subscriber を初期化する。
/// RUST_LOG が設定されている場合は設定ファイルのログレベルより優先する。
/// format が "text" の場合はプレーンテキスト、それ以外は JSON で出力する。
pub fn init_tracing(cfg: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let registry = tracing_subscriber::registry().with(filter);

    if cfg.format == "text" {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(fmt_layer).try_init()?;
    }
    Ok(())
}
