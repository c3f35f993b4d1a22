use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod errors;
mod generation;
mod models;
mod stream;

#[cfg(test)]
mod client_tests;
#[cfg(test)]
mod errors_tests;

use crate::client::{BackendClient, PlaylistBackend};
use crate::config::load_config;
use crate::errors::GenerationError;
use crate::generation::{GenerationController, SelectionStore};
use crate::stream::{GenerationProgress, ProgressEvent};

#[derive(Parser)]
#[command(name = "playlist-curator")]
#[command(about = "Generate a playlist from a description, curate it, and save it to Spotify")]
#[command(version)]
struct Args {
    /// What the playlist should sound like, e.g. "chill indie songs for studying"
    query: String,

    /// Name for the created playlist (defaults to the generated name)
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Replace a track with one of its alternatives, as SLOT:ALTERNATIVE (both 1-based)
    #[arg(long = "swap", value_name = "SLOT:ALT")]
    swaps: Vec<String>,

    /// Leave a track out of the created playlist (1-based slot)
    #[arg(long = "skip", value_name = "SLOT")]
    skips: Vec<usize>,

    /// Spotify access token (overrides SPOTIFY_ACCESS_TOKEN)
    #[arg(long = "token")]
    token: Option<String>,

    /// Enable debug mode - print the curated playlist instead of creating it
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Quiet mode - reduce output verbosity
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("playlist_curator=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = load_config()?;
    let client = BackendClient::new(&config);
    let mut controller = GenerationController::new(client, &config);
    if let Some(token) = args.token.clone() {
        controller.set_credential(Some(token));
    }

    // First Ctrl-C abandons the running generation; a second one, or one outside generation, quits
    let interrupt = controller.interrupt_handle();
    ctrlc::set_handler(move || {
        if interrupt.interrupt() {
            eprintln!("\nCancelling... (press Ctrl-C again to quit)");
        } else {
            std::process::exit(130);
        }
    })
    .context("failed to install Ctrl-C handler")?;

    if !args.quiet {
        println!("Generating playlist for: \"{}\"", args.query.trim());
    }

    let quiet = args.quiet;
    let mut on_progress = |event: &ProgressEvent, progress: &GenerationProgress| {
        if quiet {
            return;
        }
        match event {
            ProgressEvent::Status { message } => println!("  … {message}"),
            ProgressEvent::TrackFound { track, .. } => {
                println!("  + {} by {} ({} found)", track.title, track.artist, progress.count)
            }
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. } => {}
        }
    };

    match controller.generate(&args.query, &mut on_progress) {
        Ok(()) => {}
        Err(GenerationError::Abandoned) => {
            controller.start_over();
            anyhow::bail!("Playlist generation cancelled");
        }
        Err(e) => return Err(report_failure(&mut controller, e)),
    }

    if let Some(attempt) = controller.active_attempt() {
        let elapsed = chrono::Utc::now() - attempt.started_at;
        tracing::info!(
            attempt = attempt.id,
            query = %attempt.query,
            elapsed_ms = elapsed.num_milliseconds(),
            "generation finished"
        );
    }

    if controller.store().is_empty() {
        anyhow::bail!("No tracks were found for this description - try rephrasing it");
    }

    apply_curation(controller.store_mut(), &args)?;
    print_playlist(controller.store(), args.quiet && !args.debug);

    if args.debug {
        println!(
            "\n🔍 DEBUG MODE: would create '{}' with {} of {} tracks",
            effective_name(controller.store(), &args),
            controller.store().selected_count(),
            controller.store().tracks().len()
        );
        if let Some(attempt) = controller.active_attempt() {
            println!(
                "   stream: {} tracks streamed, {} chunks, {} frames, {} dropped, {} bytes truncated",
                attempt.streamed_tracks,
                attempt.stats.chunks,
                attempt.stats.frames,
                attempt.stats.dropped_frames,
                attempt.stats.truncated_bytes
            );
        }
        for id in controller.store().commit_selection() {
            println!("   {id}");
        }
        return Ok(());
    }

    let name = effective_name(controller.store(), &args);
    println!("\n🎵 Creating playlist '{name}'...");
    match controller.commit(&name, args.query.trim()) {
        Ok(created) => {
            tracing::debug!(playlist_id = ?created.playlist_id, message = ?created.message, "playlist created");
            println!("✓ Playlist \"{name}\" created successfully!");
            if let Some(url) = created.playlist_url {
                println!("  {url}");
            }
            Ok(())
        }
        Err(e) => Err(report_failure(&mut controller, e)),
    }
}

fn effective_name(store: &SelectionStore, args: &Args) -> String {
    args.name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| store.playlist_name().to_string())
}

/// Apply `--swap` and `--skip` to the generated selection
fn apply_curation(store: &mut SelectionStore, args: &Args) -> Result<()> {
    for swap in &args.swaps {
        let (slot, alt) = parse_swap(swap)?;
        let track = store
            .tracks()
            .get(slot - 1)
            .with_context(|| format!("--swap {swap}: there is no track {slot}"))?;
        let alternative = track
            .alternatives
            .get(alt - 1)
            .with_context(|| format!("--swap {swap}: track {slot} has no alternative {alt}"))?;

        let (original_id, alternative_id) = (track.id.clone(), alternative.id.clone());
        store.substitute(&original_id, &alternative_id)?;
    }

    for &slot in &args.skips {
        let id = store
            .tracks()
            .get(slot.wrapping_sub(1))
            .map(|track| track.id.clone())
            .with_context(|| format!("--skip {slot}: there is no track {slot}"))?;
        if store.is_selected(&id) {
            store.toggle(&id);
        }
    }

    Ok(())
}

fn parse_swap(raw: &str) -> Result<(usize, usize)> {
    let (slot, alt) = raw
        .split_once(':')
        .with_context(|| format!("--swap expects SLOT:ALT, got '{raw}'"))?;
    let slot: usize = slot.trim().parse().with_context(|| format!("bad slot in '{raw}'"))?;
    let alt: usize = alt.trim().parse().with_context(|| format!("bad alternative in '{raw}'"))?;
    if slot == 0 || alt == 0 {
        anyhow::bail!("--swap positions are 1-based, got '{raw}'");
    }
    Ok((slot, alt))
}

fn print_playlist(store: &SelectionStore, quiet: bool) {
    if quiet {
        return;
    }

    println!("\n\"{}\"", store.playlist_name());
    println!("{}", "=".repeat(store.playlist_name().chars().count() + 2));

    for (i, track) in store.tracks().iter().enumerate() {
        let mark = if store.is_selected(&track.id) { "✓" } else { " " };
        println!("  [{mark}] {}. {} by {}", i + 1, track.title, track.artist);
        for (j, alt) in track.alternatives.iter().enumerate() {
            println!("        alt {}: {} by {}", j + 1, alt.title, alt.artist);
        }
    }
}

/// Print a user-facing failure, waiting out the re-auth delay when the session expired
fn report_failure<B: PlaylistBackend>(
    controller: &mut GenerationController<B>,
    error: GenerationError,
) -> anyhow::Error {
    eprintln!("✗ {error}");
    if let Some(raw) = error.raw_response() {
        eprintln!("\nAI response:\n{raw}");
    }

    if let Some(due) = controller.pending_reauth() {
        std::thread::sleep(due.saturating_duration_since(Instant::now()));
        if controller.take_due_reauth(Instant::now()) {
            eprintln!("Reconnect your Spotify account and set a fresh SPOTIFY_ACCESS_TOKEN.");
        }
    }

    anyhow::Error::new(error)
}
