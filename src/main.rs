use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use vibecheck::config::{self, Settings};
use vibecheck::flow::{Orchestrator, ViewState};
use vibecheck::narrative::Generator;
use vibecheck::reveal::Typewriter;
use vibecheck::session::SessionProvider;
use vibecheck::stats::{StatsClient, TimeRange};

/// Per-character delay for the narrative reveal.
const REVEAL_INTERVAL: Duration = Duration::from_millis(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let settings = Settings::load().context("configuration error")?;
    info!("Configuration loaded");

    let session = Arc::new(SessionProvider::new(
        &settings.supabase_url,
        &settings.supabase_anon_key,
        &settings.redirect_uri,
    ));
    let mut orchestrator = Orchestrator::new(
        Arc::clone(&session),
        StatsClient::new(),
        Generator::new(&settings.gemini_api_key, &settings.gemini_model),
        settings.top_limit,
    );

    println!("Discover your personality based on your music taste.\n");
    let url = orchestrator.begin_login(config::DEFAULT_SCOPES);
    println!("Open this URL in your browser and log in to Spotify:\n\n  {url}\n");
    println!(
        "After logging in you land on {} with tokens in the URL.",
        settings.redirect_uri
    );

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let redirect = prompt(&mut input, "Paste the full redirect URL here: ").await?;

    if let Err(e) = orchestrator.resolve_session(&redirect).await {
        eprintln!("\n{e}");
        eprintln!("Go back and try logging in again.");
        return Ok(());
    }

    let name = session
        .current()
        .and_then(|s| s.display_name)
        .unwrap_or_else(|| "you".to_string());
    println!("\nHey {name}, analyzing your music taste...");

    orchestrator.run_fetch().await;
    orchestrator.sync_session();
    render(&orchestrator).await;

    loop {
        if matches!(orchestrator.state(), ViewState::Error(_)) {
            prompt(&mut input, "\nPress enter to sign out > ").await?;
            orchestrator.sign_out().await;
            println!("Signed out.");
            break;
        }

        let choice = prompt(
            &mut input,
            "\nTime range: [1] last month  [2] last six months  [3] all time  |  [o] sign out  [q] quit > ",
        )
        .await?;

        match choice.trim() {
            "1" => retime(&mut orchestrator, TimeRange::LastMonth).await,
            "2" => retime(&mut orchestrator, TimeRange::LastSixMonths).await,
            "3" => retime(&mut orchestrator, TimeRange::AllTime).await,
            "o" => {
                orchestrator.sign_out().await;
                println!("Signed out.");
                break;
            }
            "q" => break,
            other => {
                println!("Unrecognized choice: {other:?}");
                continue;
            }
        }
    }

    Ok(())
}

async fn retime(orchestrator: &mut Orchestrator, range: TimeRange) {
    println!("\nRefetching for {}...", range.label());
    orchestrator.change_time_range(range).await;
    orchestrator.sync_session();
    render(orchestrator).await;
}

/// Render the current view: an error with its sign-out hint, or the revealed
/// narrative followed by the ranked statistics.
async fn render(orchestrator: &Orchestrator) {
    if let ViewState::Error(e) = orchestrator.state() {
        println!("\nOops! Something went wrong.");
        println!("{e}");
        return;
    }

    if !orchestrator.ready_to_render() {
        println!("\nNothing to show yet.");
        return;
    }

    println!();
    match orchestrator.narrative() {
        Some(narrative) => {
            if let Some(summary) = &narrative.summary {
                println!("** {summary} **\n");
            }
            reveal_text(&narrative.body).await;
            println!("\n");
        }
        None => println!("(Your description is unavailable right now.)\n"),
    }

    println!("Current top artists ({}):", orchestrator.time_range().label());
    for (i, artist) in orchestrator.artists().iter().enumerate() {
        println!("  {}. {}", i + 1, artist.name);
    }

    println!("\nCurrent top tracks:");
    for (i, track) in orchestrator.tracks().iter().enumerate() {
        match track.primary_artist() {
            Some(by) => println!("  {}. {} - {}", i + 1, track.name, by),
            None => println!("  {}. {}", i + 1, track.name),
        }
    }

    if !orchestrator.genres().is_empty() {
        println!("\nGenres: {}", orchestrator.genres().join(", "));
    }

    let features = orchestrator.features();
    println!(
        "\nDanceability {:.2}  Energy {:.2}  Valence {:.2}",
        features.danceability, features.energy, features.valence
    );
}

/// Character-by-character reveal straight to stdout. Each tick prints only
/// the delta, so the text grows in place.
async fn reveal_text(text: &str) {
    use std::io::Write;

    let mut printed = 0usize;
    let tw = Typewriter::start(text.to_string(), REVEAL_INTERVAL, move |prefix| {
        let delta = &prefix[printed..];
        printed = prefix.len();
        print!("{delta}");
        let _ = std::io::stdout().flush();
    });
    tw.finished().await;
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, message: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{message}");
    std::io::stdout().flush().ok();
    let line = input
        .next_line()
        .await
        .context("failed to read stdin")?
        .unwrap_or_default();
    Ok(line.trim().to_string())
}
