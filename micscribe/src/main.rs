use std::time::Duration;

use micscribe_lib::audio::{CpalInput, MicrophoneStream};
use micscribe_lib::config::ConfigManager;
use micscribe_lib::recognition::SpeechClient;
use micscribe_lib::transcription::{run_session, LISTENING_BANNER, STOP_NOTICE};
use micscribe_lib::utils::logging::init_logging;
use micscribe_lib::utils::AppResult;
use tracing::{error, info, warn};

async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the session only ends when the service ends it
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run() -> AppResult<()> {
    let config = ConfigManager::load()?;
    config.validate()?;

    let client = SpeechClient::from_env(
        config.connection_config(),
        &config.recognition.credentials_env,
    )?;

    let input = CpalInput::new(config.audio.device.as_deref());
    let mut mic = MicrophoneStream::open(&input, config.capture_format())?;

    println!("{}", LISTENING_BANNER);

    let summary = run_session(
        &mut mic,
        &client,
        config.streaming_config(),
        std::io::stdout(),
        wait_for_interrupt(),
        Duration::from_millis(config.behavior.shutdown_grace_ms),
    )
    .await?;

    info!(
        "Recognition stream ended: {} final transcript(s)",
        summary.transcripts
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    match run().await {
        Ok(()) => Ok(()),
        Err(e) if e.is_user_interrupt() => {
            println!("\n{}", STOP_NOTICE);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            if let Some(hint) = e.recovery_hint() {
                eprintln!("hint: {}", hint);
            }
            Err(anyhow::Error::from(e).context("micscribe failed"))
        }
    }
}
