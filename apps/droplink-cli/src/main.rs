//! Terminal frontend for the droplink relay.

mod config;
mod logging;
mod renderer;
mod session;

use std::{
    error::Error,
    io::{BufRead, Write},
    time::Duration,
};

use relay_core::{ConfirmPrompt, decide_clear, device_display_name, is_clear_command, load_or_create_device_id};
use relay_transport::RelayApi;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::renderer::TerminalRenderer;
use crate::session::{RelaySession, SessionEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = config::CliConfig::from_env()?;
    let device_id = load_or_create_device_id(&config.device_id_path())?;
    info!(server_url = %config.server_url, device_id = %device_id, "starting droplink-cli");

    let api = RelayApi::new(&config.server_url)?;
    // Device registration is best effort; the session works without it.
    if let Err(err) = api.sync_device(&device_id, &device_display_name()).await {
        warn!(%err, "device sync failed");
    }

    println!("droplink-cli connected to {} as {device_id}", config.server_url);
    println!("type a message and press enter; /upload <path> sends a file; ctrl-d quits");

    let (events_tx, events_rx) = mpsc::channel(32);
    std::thread::spawn(move || read_input(events_tx));

    // Held for the whole session: the CLI has no lifecycle signals today, but
    // the session suspends polling whenever these flip to false.
    let (_visibility_tx, visibility_rx) = watch::channel(true);
    let (_connectivity_tx, connectivity_rx) = watch::channel(true);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl-c received");
            ctrl_c_cancel.cancel();
        }
    });

    let renderer = TerminalRenderer::new(std::io::stdout(), device_id.clone());
    let session = RelaySession::new(api, renderer, device_id, config.message_limit);
    session
        .run(
            events_rx,
            visibility_rx,
            connectivity_rx,
            Duration::from_millis(config.poll_interval_ms),
            cancel,
        )
        .await;

    Ok(())
}

/// Blocking stdin reader owning the console for the whole process lifetime.
fn read_input(events: mpsc::Sender<SessionEvent>) {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    forward_input(&mut input, &events);
    // Dropping the sender ends the session loop.
}

/// Forward console lines as session events, resolving clear-all triggers
/// through the interactive confirmation gate before the session ever sees
/// them.
///
/// The prompt reads through the same reader as the line loop; one stdin lock
/// serves both, so the confirmation answers can be entered between lines.
fn forward_input<R: BufRead>(input: &mut R, events: &mpsc::Sender<SessionEvent>) {
    loop {
        let Some(line) = read_trimmed_line(input) else {
            break;
        };
        let event = if is_clear_command(&line) {
            let mut prompt = ReaderPrompt {
                input: &mut *input,
            };
            SessionEvent::Clear(decide_clear(&mut prompt))
        } else {
            SessionEvent::Line(line)
        };
        if events.blocking_send(event).is_err() {
            break;
        }
    }
}

struct ReaderPrompt<'a, R> {
    input: &'a mut R,
}

impl<R: BufRead> ConfirmPrompt for ReaderPrompt<'_, R> {
    fn confirm_destructive(&mut self, warning: &str) -> bool {
        println!("! {warning}");
        matches!(
            prompt_line(self.input, "type 'yes' to continue: "),
            Some(answer) if answer.trim().eq_ignore_ascii_case("yes")
        )
    }

    fn request_code(&mut self) -> Option<String> {
        prompt_line(self.input, "confirmation code: ").filter(|code| !code.trim().is_empty())
    }
}

fn prompt_line<R: BufRead>(input: &mut R, prompt: &str) -> Option<String> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();
    read_raw_line(input)
}

fn read_raw_line<R: BufRead>(input: &mut R) -> Option<String> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn read_trimmed_line<R: BufRead>(input: &mut R) -> Option<String> {
    read_raw_line(input).map(|line| line.trim_end_matches(['\r', '\n']).to_owned())
}
