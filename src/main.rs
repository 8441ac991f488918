use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing::{info, warn, error};

use docflow_notify::{config::Config, services::FeedMode, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DocFlow notification client ({})...", config.environment);

    let state = AppState::from_config(config)?;

    // 可以通过环境变量注入令牌，等同于登录
    if let Ok(token) = std::env::var("SESSION_TOKEN") {
        state.session.set_token(&token)?;
    }

    let mode = state.feed.mount().await;
    if mode == FeedMode::PollOnly {
        warn!("No session token found, live notifications unavailable");
    }

    if let Err(e) = state.panel.set_open(true).await {
        error!("Failed to load recent notifications: {}", e);
    }

    let mut revisions = state.store.subscribe();
    let mut events = state.connection_manager.events();

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&state);
            }
            event = events.recv() => {
                if let Ok(event) = event {
                    info!("Connection event: {:?}", event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down notification client");
                break;
            }
        }
    }

    state.feed.unmount();
    state.connection_manager.disconnect();

    Ok(())
}

fn render(state: &AppState) {
    let view = state.panel.render();

    info!(
        "Unread: {} | loading: {} | {} notifications",
        view.badge.label.as_deref().unwrap_or("0"),
        view.loading,
        view.items.len()
    );
    for item in &view.items {
        info!(
            "  [{:?}] {} {} - {} ({})",
            item.style,
            item.icon.name(),
            item.title,
            item.message,
            item.time_ago
        );
    }
}
