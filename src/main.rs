use std::env;

use anyhow::{Context, Result};
use log::{info, warn};
use pollsync::models::websocket::PushEvent;
use pollsync::token::{FileTokenStore, MemoryTokenStore, TokenStore};
use pollsync::{AppState, Config, ConnectionStatus, Event, PollId, PollsState};

fn log_poll(store: &PollsState, poll_id: PollId) {
    if let Some(poll) = store.get(poll_id).or(store.current().filter(|p| p.id == poll_id)) {
        info!(
            "#{} {:?}: {} votes, {} likes",
            poll.id, poll.title, poll.total_votes, poll.total_likes
        );
        for option in &poll.options {
            info!(
                "    {:<30} {:>5} ({}%)",
                option.text,
                option.vote_count,
                poll.percentage(option.id)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scope = env::args()
        .nth(1)
        .map(|arg| arg.parse::<PollId>())
        .transpose()
        .context("poll id argument must be a positive integer")?;

    let config = Config::from_env();
    let token_store: Box<dyn TokenStore> = match &config.token_file {
        Some(path) => Box::new(FileTokenStore::new(path)),
        None => Box::new(MemoryTokenStore::new()),
    };
    let mut app = AppState::new(config, token_store, ConnectionStatus::global())
        .context("failed to initialise client")?;

    if let (Ok(email), Ok(password)) = (env::var("POLLSYNC_EMAIL"), env::var("POLLSYNC_PASSWORD")) {
        app.login(&email, &password).await.context("login failed")?;
    }

    match scope {
        Some(poll_id) => {
            app.fetch_poll(poll_id).await.context("failed to fetch poll")?;
            log_poll(app.store(), poll_id);
        }
        None => {
            app.fetch_polls().await.context("failed to fetch polls")?;
            info!("{} polls loaded", app.store().polls().len());
            for poll in app.store().polls() {
                info!("#{} {:?}", poll.id, poll.title);
            }
        }
    }

    app.connect(scope).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = app.next_event() => match event {
                Some(Event::Connected) => info!("Live updates on"),
                Some(Event::Disconnected) => warn!("Live updates paused"),
                Some(Event::Push(PushEvent::VoteUpdate { poll_id, .. })) => {
                    log_poll(app.store(), poll_id)
                }
                Some(Event::Push(PushEvent::LikeUpdate { poll_id, .. })) => {
                    log_poll(app.store(), poll_id)
                }
                Some(Event::Push(PushEvent::PollCreated(poll))) => {
                    info!("New poll #{} {:?}", poll.id, poll.title)
                }
                None => break,
            }
        }
    }

    app.disconnect().await;
    Ok(())
}
