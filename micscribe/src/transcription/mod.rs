/// End-to-end transcription session
///
/// Wires the microphone bridge to a speech recognizer and prints every final
/// transcript. Interim results are ignored.

use crate::audio::{InputStream, MicrophoneStream};
use crate::recognition::{
    RecognitionError, ResponseItem, SpeechRecognizer, StreamingRecognitionConfig,
};
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Printed once capture has started
pub const LISTENING_BANNER: &str = "🎙️ Speak into the microphone (Ctrl+C to stop)...";

/// Printed when the operator interrupts the session
pub const STOP_NOTICE: &str = "🛑 Stopped by user";

/// Errors that can occur during transcription
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    /// The recognition service or client failed
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Writing a transcript failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// The operator stopped the session
    #[error("Interrupted by user after {transcripts} transcript(s)")]
    Interrupted {
        /// Final transcripts printed before shutdown
        transcripts: usize,
    },
}

impl TranscriptionError {
    /// Whether this is the expected operator interrupt
    pub fn is_user_interrupt(&self) -> bool {
        matches!(self, TranscriptionError::Interrupted { .. })
    }
}

/// Writes final transcripts to an output
pub struct TranscriptPrinter<W: Write> {
    out: W,
    printed: usize,
    interim: usize,
}

impl<W: Write> TranscriptPrinter<W> {
    /// Create a printer writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            interim: 0,
        }
    }

    /// Final transcripts printed so far
    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Responses skipped because their first result was not final
    pub fn interim(&self) -> usize {
        self.interim
    }

    /// Consume the printer, returning its output
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print `alternatives[0].transcript` of every final response
    ///
    /// Responses without results and responses whose first result is not
    /// final are skipped. The first error ends the loop.
    pub async fn listen_print_loop<R>(
        &mut self,
        mut responses: R,
    ) -> Result<(), TranscriptionError>
    where
        R: Stream<Item = ResponseItem> + Unpin,
    {
        while let Some(response) = responses.next().await {
            let response = response?;

            if response.results.is_empty() {
                continue;
            }

            match response.final_transcript() {
                Some(transcript) => {
                    writeln!(self.out, "✅ You said: {}\n", transcript)?;
                    self.out.flush()?;
                    self.printed += 1;
                    info!("Final transcript #{}: {}", self.printed, transcript);
                }
                None => {
                    self.interim += 1;
                    debug!("Skipping interim result");
                }
            }
        }

        debug!("Response stream ended");
        Ok(())
    }
}

/// Outcome of a session that ended without being interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Final transcripts printed
    pub transcripts: usize,
    /// Interim results skipped
    pub interim: usize,
}

/// Run one transcription session until the service ends it or `interrupt`
/// resolves
///
/// On interrupt the microphone is closed, which ends the audio sequence; the
/// recognizer then gets up to `shutdown_grace` to deliver trailing results.
///
/// # Errors
/// Returns `TranscriptionError::Interrupted` when `interrupt` fired, and the
/// recognition or output error otherwise.
pub async fn run_session<S, R, W, F>(
    mic: &mut MicrophoneStream<S>,
    recognizer: &R,
    streaming_config: StreamingRecognitionConfig,
    out: W,
    interrupt: F,
    shutdown_grace: Duration,
) -> Result<SessionSummary, TranscriptionError>
where
    S: InputStream,
    R: SpeechRecognizer,
    W: Write,
    F: Future<Output = ()>,
{
    info!("Starting transcription session");

    let chunks = mic.chunks();
    let mut printer = TranscriptPrinter::new(out);

    let result = {
        let run = async {
            let responses = recognizer
                .streaming_recognize(streaming_config, chunks)
                .await?;
            printer.listen_print_loop(responses).await?;
            Ok::<(), TranscriptionError>(())
        };
        tokio::pin!(run);
        tokio::pin!(interrupt);

        tokio::select! {
            result = &mut run => result,
            _ = &mut interrupt => {
                info!("Interrupt received, closing microphone");
                mic.close();

                match tokio::time::timeout(shutdown_grace, &mut run).await {
                    Ok(Ok(())) => debug!("Trailing results drained"),
                    Ok(Err(e)) => warn!("Session ended with error during shutdown: {}", e),
                    Err(_) => warn!(
                        "No end of results within {}ms, abandoning",
                        shutdown_grace.as_millis()
                    ),
                }

                Err(TranscriptionError::Interrupted { transcripts: 0 })
            }
        }
    };

    mic.close();

    info!(
        "Transcription session finished: {} final, {} interim",
        printer.printed(),
        printer.interim()
    );

    match result {
        Ok(()) => Ok(SessionSummary {
            transcripts: printer.printed(),
            interim: printer.interim(),
        }),
        Err(TranscriptionError::Interrupted { .. }) => Err(TranscriptionError::Interrupted {
            transcripts: printer.printed(),
        }),
        Err(e) => Err(e),
    }
}
