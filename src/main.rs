use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yomiage::audio::{AudioSink, CompletionSender, SilentSink, SinkFactory};
use yomiage::integration::{
    wait_until_spoken, Orchestrator, OrchestratorCommand, OrchestratorHandle, ReaderConfig,
};
use yomiage::messages::{AudioChunk, PageRef, PlaybackStatus, RuntimeEnvelope, RuntimeMessage};
use yomiage::player::{
    spawn_page_context, Modifier, PageEnvelope, PageHandle, PageInput, PageSurface, PointerEvent,
    TerminalSurface, TOP_FRAME,
};
use yomiage::settings::{load_or_default, JsonFilePreferenceStore, PreferenceStore, VoicePreference};
use yomiage::speech::{choose_style, preview_voice, HttpSpeechClient, SpeechApi, PREVIEW_TEXT};
use yomiage::transport::LocalPageTransport;
use yomiage::SERVICE_DOWN_MESSAGE;

/// The terminal stands in for the web page
const TERMINAL_PAGE_URL: &str = "tty://stdin";

#[derive(Parser)]
#[command(name = "yomiage", version, about = "Read text aloud with a local AivisSpeech engine")]
struct Cli {
    /// Voice preference file (default: <config dir>/yomiage/voice.json)
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Show captions without opening the audio device
    #[arg(long, global = true)]
    mute: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak each line typed on stdin (`:stop` stops, `:quit` exits)
    Read {
        /// Speak this text once and exit when playback ends
        #[arg(long)]
        text: Option<String>,
    },

    /// List the engine's speakers and styles
    Voices,

    /// Save the voice used for reading
    SetVoice {
        #[arg(long)]
        speaker: String,

        /// Defaults to the speaker's first style
        #[arg(long)]
        style: Option<String>,

        #[arg(long)]
        speed: Option<f64>,
    },

    /// Speak a short phrase with the saved voice
    TestVoice,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries captions
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yomiage=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ReaderConfig::default();
    if let Some(path) = cli.preferences {
        config = config.with_preference_path(path);
    }
    if cli.mute {
        config = config.without_audio_output();
    }
    config.validate()?;

    let preferences = Arc::new(JsonFilePreferenceStore::new(config.preference_path()?));

    match cli.command {
        Command::Read { text } => read(config, preferences, text).await,
        Command::Voices => voices().await,
        Command::SetVoice {
            speaker,
            style,
            speed,
        } => set_voice(preferences.as_ref(), &speaker, style.as_deref(), speed).await,
        Command::TestVoice => test_voice(config, preferences.as_ref()).await,
    }
}

async fn read(
    config: ReaderConfig,
    preferences: Arc<JsonFilePreferenceStore>,
    text: Option<String>,
) -> Result<()> {
    info!("Starting yomiage reader");

    let speech = Arc::new(HttpSpeechClient::new()?);
    let transport = Arc::new(LocalPageTransport::new());
    let (orchestrator, handle) =
        Orchestrator::new(&config, speech, transport.clone(), preferences)?;

    let page = PageRef::new(1, TERMINAL_PAGE_URL);
    let page_handle = spawn_terminal_page(&config, page.clone(), handle.runtime_sender())?;
    transport.register(&page, page_handle.mailbox.clone());

    let mut events = handle.subscribe();
    let task = orchestrator.start();
    handle
        .send_command(OrchestratorCommand::SetActivePage(page.clone()))
        .await?;

    match text {
        Some(text) => {
            if text.trim().is_empty() {
                bail!("Nothing to read");
            }
            page_handle.input.send(PageInput::Select(text.clone()))?;
            handle
                .send_command(OrchestratorCommand::SpeakSelection { page: page.clone(), hint: text })
                .await?;
            let progress = wait_until_spoken(&mut events).await;
            if let Some(error) = progress.failure() {
                warn!("Reading failed: {}", error);
            }
        }
        None => interactive(&handle, &page_handle, config.gesture_modifier).await?,
    }

    handle.send_command(OrchestratorCommand::Shutdown).await?;
    task.await?;

    transport.unregister(&page);
    tokio::task::spawn_blocking(move || page_handle.join()).await?;
    Ok(())
}

/// Each line becomes the page selection and is spoken with the gesture.
async fn interactive(
    handle: &OrchestratorHandle,
    page: &PageHandle,
    modifier: Modifier,
) -> Result<()> {
    eprintln!("Type text to read it aloud. :stop stops playback, :quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":stop" => {
                handle
                    .runtime_sender()
                    .send(RuntimeEnvelope::detached(RuntimeMessage::StopAll))?;
            }
            "" => {}
            _ => {
                page.input.send(PageInput::Select(line.clone()))?;
                page.input
                    .send(PageInput::PointerDown(PointerEvent::primary_with(modifier)))?;
            }
        }
    }
    Ok(())
}

async fn voices() -> Result<()> {
    let client = HttpSpeechClient::new()?;
    let speakers = client.speakers().await.context(SERVICE_DOWN_MESSAGE)?;

    for speaker in speakers {
        println!("{}", speaker.name);
        for style in speaker.styles {
            println!("  {:<20} {}", style.name, style.id);
        }
    }
    Ok(())
}

async fn set_voice(
    preferences: &dyn PreferenceStore,
    speaker: &str,
    style: Option<&str>,
    speed: Option<f64>,
) -> Result<()> {
    let client = HttpSpeechClient::new()?;
    let speakers = client.speakers().await.context(SERVICE_DOWN_MESSAGE)?;
    let chosen = choose_style(&speakers, speaker, style)?;

    let speed = speed.unwrap_or_else(|| load_or_default(preferences).speed);
    if !(speed > 0.0) {
        bail!("Speed must be positive, got {}", speed);
    }

    let preference = VoicePreference::new(speaker, chosen.name.clone(), speed);
    preferences.save(&preference)?;
    println!(
        "Voice set to {} / {} (style {}), speed {}",
        preference.speaker_name, preference.style_name, chosen.id, preference.speed
    );
    Ok(())
}

async fn test_voice(config: ReaderConfig, preferences: &dyn PreferenceStore) -> Result<()> {
    let preference = load_or_default(preferences);
    let client = HttpSpeechClient::new()?;

    info!(
        "Testing voice {}/{} at speed {}",
        preference.speaker_name, preference.style_name, preference.speed
    );
    let audio = preview_voice(
        &client,
        &preference.speaker_name,
        &preference.style_name,
        preference.speed,
    )
    .await
    .context(SERVICE_DOWN_MESSAGE)?;

    let (runtime_tx, mut runtime_rx) = tokio::sync::mpsc::unbounded_channel();
    let page = spawn_terminal_page(&config, PageRef::new(1, TERMINAL_PAGE_URL), runtime_tx)?;
    page.mailbox
        .send(PageEnvelope::notify(AudioChunk::new(audio, PREVIEW_TEXT).into_message(None)))?;

    let mut outcome = Ok(());
    let mut played = false;
    while let Some(envelope) = runtime_rx.recv().await {
        match envelope.message {
            RuntimeMessage::PlaybackStatus { status } => match status {
                PlaybackStatus::Playing => played = true,
                PlaybackStatus::Stopped if played => break,
                PlaybackStatus::Stopped => {}
            },
            RuntimeMessage::ChunkDropped { .. } => {
                outcome = Err(anyhow!("The voice sample could not be played"));
                break;
            }
            _ => {}
        }
    }

    tokio::task::spawn_blocking(move || page.join()).await?;
    outcome
}

fn spawn_terminal_page(
    config: &ReaderConfig,
    page: PageRef,
    runtime_tx: tokio::sync::mpsc::UnboundedSender<RuntimeEnvelope>,
) -> yomiage::Result<PageHandle> {
    let audio = config.enable_audio_output;
    spawn_page_context(page, TOP_FRAME, config.gesture_modifier, runtime_tx, move |completions| {
        let surface: Box<dyn PageSurface> = Box::new(TerminalSurface::new());
        (sink_factory(audio, completions), surface)
    })
}

fn sink_factory(audio: bool, completions: CompletionSender) -> SinkFactory {
    Box::new(move || open_sink(audio, completions.clone()))
}

#[cfg(feature = "audio-io")]
fn open_sink(audio: bool, completions: CompletionSender) -> yomiage::Result<Box<dyn AudioSink>> {
    use yomiage::audio::CpalSink;

    if !audio {
        return Ok(Box::new(SilentSink::new(completions)));
    }
    match CpalSink::new(completions.clone()) {
        Ok(sink) => Ok(Box::new(sink)),
        Err(e) => {
            warn!("{}; playing without sound", e);
            Ok(Box::new(SilentSink::new(completions)))
        }
    }
}

#[cfg(not(feature = "audio-io"))]
fn open_sink(audio: bool, completions: CompletionSender) -> yomiage::Result<Box<dyn AudioSink>> {
    if audio {
        warn!("Built without audio output; playing without sound");
    }
    Ok(Box::new(SilentSink::new(completions)))
}
