use strategy_server::config::ServerConfig;

/// Run the proxy server until interrupted. Settings come from the
/// environment; `port` overrides `PORT`.
pub fn run(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "StrategySuite server on http://localhost:{actual_port}  (storage: {}, suggestions: {})",
            on_off(config.data_path.is_some()),
            on_off(config.gemini.is_some()),
        );

        tokio::select! {
            res = strategy_server::serve_on(config, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
