//! Victus console
//!
//! Drives the agent backend from a terminal: one-shot chat turns, tailing an
//! event stream, and hands-free voice mode over the default microphone.
//!
//! Configuration comes from `.env` and the process environment
//! (`VICTUS_API_BASE_URL`, `VICTUS_WS_URL`, `VICTUS_WAKE_WORD`,
//! `VICTUS_LOG_LEVEL`); flags override both.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use victus_core::api::{AuthApi, SessionsApi, SettingsApi, VoiceSettings};
use victus_core::{
    init_logging, load_env, ClientConfig, EventStreamClient, HttpRequestClient, SseMessage, StreamRequest,
};
use victus_provider_voice::{
    CaptureConfig, ConnectionState, VoiceEvent, VoiceSession, VoiceSocketConfig,
};

#[derive(Parser, Debug)]
#[command(name = "run-console", about = "Terminal console for the Victus agent")]
struct Cli {
    /// Log filter directive (e.g. "info", "victus_core=debug")
    #[arg(long, env = "VICTUS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// REST/event-stream origin
    #[arg(long, env = "VICTUS_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Voice socket endpoint
    #[arg(long, env = "VICTUS_WS_URL")]
    ws_url: Option<String>,

    /// Account email; logs in before running the command
    #[arg(long, env = "VICTUS_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, env = "VICTUS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Create a development session instead of logging in
    #[arg(long)]
    dev: bool,

    /// Reuse an existing chat session instead of creating one
    #[arg(long, env = "VICTUS_SESSION_ID")]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message and print the assistant's reply
    Chat {
        /// Message text
        text: String,
    },
    /// Print events from a streaming endpoint until it ends or Ctrl-C
    Stream {
        /// Path relative to the API base
        path: String,
        /// Send a POST with this JSON body instead of a GET
        #[arg(long)]
        post: Option<String>,
    },
    /// Talk to the agent through the microphone until Ctrl-C
    Voice {
        /// Override the stored chunk duration (50-2000 ms)
        #[arg(long)]
        chunk_ms: Option<u32>,
    },
    /// Print the session history
    History,
    /// End the server-side login session
    Logout,
}

fn main() -> Result<()> {
    // .env must be loaded before clap resolves `env = ...` defaults
    load_env()?;
    let cli = Cli::parse();
    std::env::set_var("VICTUS_LOG_LEVEL", &cli.log_level);
    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    if let Some(url) = &cli.ws_url {
        config.voice_ws_url = url.clone();
    }
    config.validate()?;

    let http = HttpRequestClient::new(&config.api_base_url)?;
    let auth = AuthApi::new(http.clone());

    if let Command::Logout = cli.command {
        let response = auth.logout().await?;
        println!("logged out: {}", response.ok);
        return Ok(());
    }

    sign_in(&auth, &cli).await?;

    let sessions = SessionsApi::new(http.clone());
    let session_id = match &cli.session {
        Some(id) => id.clone(),
        None => {
            let created = sessions.create().await?;
            info!(session_id = %created.session_id, "Created chat session");
            created.session_id
        }
    };

    match &cli.command {
        Command::Chat { text } => chat(&sessions, &session_id, text).await,
        Command::History => history(&sessions, &session_id).await,
        Command::Stream { path, post } => stream(http, path, post.as_deref()).await,
        Command::Voice { chunk_ms } => voice(http, &config, &session_id, *chunk_ms).await,
        Command::Logout => Ok(()),
    }
}

async fn sign_in(auth: &AuthApi, cli: &Cli) -> Result<()> {
    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        auth.login(email, password)
            .await
            .context("login failed")?;
        return Ok(());
    }
    if cli.dev {
        let response = auth.bootstrap_dev_session().await?;
        info!(user = %response.user.id, "Using development session");
        return Ok(());
    }
    match auth.me().await {
        Ok(response) => info!(user = %response.user.id, "Already signed in"),
        Err(e) => warn!(error = %e, "Not signed in; pass --email/--password or --dev"),
    }
    Ok(())
}

async fn chat(sessions: &SessionsApi, session_id: &str, text: &str) -> Result<()> {
    let reply = sessions.post_message(session_id, text).await?;
    println!("{}", reply.assistant_text);
    if let Some(pending) = reply.pending_confirmation {
        match pending.required_phrase {
            Some(phrase) => println!("[confirmation required: type \"{}\"]", phrase),
            None => println!("[confirmation required: {:?}]", pending.kind),
        }
    }
    Ok(())
}

async fn history(sessions: &SessionsApi, session_id: &str) -> Result<()> {
    let history = sessions.history(session_id).await?;
    for message in &history.messages {
        println!("{:?}: {}", message.role, message.content);
    }
    for call in &history.tool_calls {
        println!("[tool {} {:?}] {}", call.name, call.status, call.args);
    }
    Ok(())
}

async fn stream(http: HttpRequestClient, path: &str, post: Option<&str>) -> Result<()> {
    let request = match post {
        Some(body) => {
            let body = serde_json::from_str(body).context("--post must be valid JSON")?;
            StreamRequest::post(path, body)
        }
        None => StreamRequest::get(path),
    };

    let (tx, mut rx) = mpsc::channel(64);
    let mut client = EventStreamClient::new(http, request, tx);
    client.connect();

    // The client keeps its sender alive, so the end of the stream shows up as a finished task
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            message = rx.recv() => match message {
                Some(SseMessage::Event(event)) => println!("{}: {}", event.event_type, event.data),
                Some(SseMessage::Error(e)) => {
                    client.close();
                    return Err(e.into());
                }
                None => break,
            },
            _ = tick.tick() => {
                if !client.is_open() && rx.is_empty() {
                    break;
                }
            }
        }
    }

    client.close();
    Ok(())
}

async fn voice(
    http: HttpRequestClient,
    config: &ClientConfig,
    session_id: &str,
    chunk_ms: Option<u32>,
) -> Result<()> {
    let mut settings = match SettingsApi::new(http).get().await {
        Ok(settings) => settings.voice,
        Err(e) => {
            warn!(error = %e, "Could not load voice settings; using defaults");
            VoiceSettings::default()
        }
    };
    if let Some(chunk_ms) = chunk_ms {
        settings.chunk_ms = chunk_ms;
    }

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let (level_tx, _levels) = mpsc::unbounded_channel();
    let capture = CaptureConfig {
        chunk_ms: settings.chunk_ms,
        report_levels: false,
    };
    let mut session = VoiceSession::new(
        VoiceSocketConfig::from_client_config(config),
        capture,
        event_tx,
        level_tx,
    );

    session.start(session_id).await?;
    session.apply_settings(&settings);
    println!("Listening. Press Ctrl-C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(VoiceEvent::TranscriptFinal { text, .. }) => println!("you: {}", text),
                Some(VoiceEvent::AssistantResponse { text }) => println!("victus: {}", text),
                Some(VoiceEvent::Error { message }) => eprintln!("error: {}", message),
                Some(VoiceEvent::StateChanged(ConnectionState::Error)) => {
                    session.shutdown().await;
                    bail!("voice connection lost");
                }
                Some(VoiceEvent::StateChanged(state)) => info!(%state, "Voice connection"),
                None => break,
            },
        }
    }

    session.shutdown().await;
    Ok(())
}
