//! Headless slideshow presenter

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_core::driver::{signal_channel, SignalSender};
use deck_core::{
    Deck, EventBus, ShowConfig, ShowDriver, ShowSignal, SlideId, Slideshow, TimedTransitions,
    TokioScheduler,
};

mod cli;
mod presenter;

use cli::{Args, ScriptCommand};
use presenter::ConsolePresenter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let deck = Deck::load(&args.deck)
        .with_context(|| format!("failed to load deck {}", args.deck.display()))?;
    let config = match &args.config {
        Some(path) => ShowConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ShowConfig::default(),
    };
    let start = match &args.start {
        Some(key) => Some(
            deck.id(key)
                .with_context(|| format!("no slide with id '{key}'"))?,
        ),
        None => None,
    };
    let seeks = args
        .script
        .iter()
        .map(|command| resolve(&deck, command))
        .collect::<Result<Vec<_>>>()?;

    info!(
        slides = deck.len(),
        transition = %humantime::format_duration(args.transition),
        "presenting {}",
        args.deck.display()
    );

    let presenter = Arc::new(ConsolePresenter::new(&deck));
    let bus = Arc::new(EventBus::new());
    bus.add_subscriber(presenter.clone());

    let (tx, rx) = signal_channel();
    let show = Slideshow::new(
        deck,
        TimedTransitions::new(tx.clone(), args.transition),
        TokioScheduler::new(tx.clone()),
    )
    .with_config(config)
    .with_sink(bus.clone());

    tokio::spawn(feed_script(tx.clone(), seeks, args.pace));
    tokio::spawn(stop_on_ctrl_c(tx));

    let mut show = ShowDriver::new(show, rx)
        .stop_on_end(!args.keep_open)
        .run(start)
        .await?;

    for undelivered in bus.drain_undelivered() {
        warn!(event = ?undelivered.event, at = %undelivered.failed_at, "event was not delivered");
    }
    show.cleanup(None);
    info!(visited = show.participants().len(), "show finished");
    Ok(())
}

fn resolve(deck: &Deck, command: &ScriptCommand) -> Result<ShowSignal<SlideId>> {
    Ok(match command {
        ScriptCommand::Next => ShowSignal::Next,
        ScriptCommand::Previous => ShowSignal::Previous,
        ScriptCommand::Stop => ShowSignal::Stop,
        ScriptCommand::Seek(key) => ShowSignal::Seek(
            deck.id(key)
                .with_context(|| format!("script seeks unknown slide '{key}'"))?,
        ),
    })
}

async fn feed_script(
    tx: SignalSender<SlideId>,
    script: Vec<ShowSignal<SlideId>>,
    pace: std::time::Duration,
) {
    for signal in script {
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
        if tx.send(signal).is_err() {
            return;
        }
    }
}

async fn stop_on_ctrl_c(tx: SignalSender<SlideId>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(ShowSignal::Stop);
    }
}
