//! Transcription session tests
//!
//! Run complete sessions against scripted recognizers and the mock
//! microphone: service-ended sessions, operator interrupts with and without
//! trailing results, and failures.

use futures_util::{stream, StreamExt};
use micscribe_lib::audio::mock::{MockInput, MockStream};
use micscribe_lib::audio::{AudioChunk, CaptureFormat, MicrophoneStream};
use micscribe_lib::recognition::{
    RecognitionError, RecognitionResult, ResponseItem, SpeechRecognizer,
    StreamingRecognitionConfig, StreamingRecognizeResponse,
};
use micscribe_lib::transcription::{run_session, TranscriptionError};
use std::future::{self, Future};
use std::time::{Duration, Instant};

const GRACE: Duration = Duration::from_millis(500);

/// Returns a fixed response list without waiting for audio
struct ScriptedRecognizer {
    responses: Vec<StreamingRecognizeResponse>,
}

impl SpeechRecognizer for ScriptedRecognizer {
    type Responses = stream::Iter<std::vec::IntoIter<ResponseItem>>;

    fn streaming_recognize<S>(
        &self,
        _config: StreamingRecognitionConfig,
        _audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: futures_util::Stream<Item = AudioChunk> + Send + Unpin + 'static,
    {
        let items: Vec<ResponseItem> = self.responses.iter().cloned().map(Ok).collect();
        async move { Ok(stream::iter(items)) }
    }
}

/// Consumes the whole audio sequence, then reports how many bytes it heard
struct CountingRecognizer;

impl SpeechRecognizer for CountingRecognizer {
    type Responses = stream::Iter<std::vec::IntoIter<ResponseItem>>;

    fn streaming_recognize<S>(
        &self,
        _config: StreamingRecognitionConfig,
        mut audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: futures_util::Stream<Item = AudioChunk> + Send + Unpin + 'static,
    {
        async move {
            let mut total = 0;
            while let Some(block) = audio.next().await {
                total += block.len();
            }
            let transcript = format!("{} bytes", total);
            Ok(stream::iter(vec![Ok(StreamingRecognizeResponse::single(
                transcript, true,
            ))]))
        }
    }
}

/// Never produces a response
struct StalledRecognizer;

impl SpeechRecognizer for StalledRecognizer {
    type Responses = stream::Pending<ResponseItem>;

    fn streaming_recognize<S>(
        &self,
        _config: StreamingRecognitionConfig,
        _audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: futures_util::Stream<Item = AudioChunk> + Send + Unpin + 'static,
    {
        async move { Ok(stream::pending()) }
    }
}

/// Fails to start
struct UnreachableRecognizer;

impl SpeechRecognizer for UnreachableRecognizer {
    type Responses = stream::Empty<ResponseItem>;

    fn streaming_recognize<S>(
        &self,
        _config: StreamingRecognitionConfig,
        _audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: futures_util::Stream<Item = AudioChunk> + Send + Unpin + 'static,
    {
        async move {
            Err(RecognitionError::ConnectionFailed(
                "connection refused".to_string(),
            ))
        }
    }
}

fn open_mic() -> (MockInput, MicrophoneStream<MockStream>) {
    let input = MockInput::new();
    let mic = MicrophoneStream::open(&input, CaptureFormat::default()).unwrap();
    (input, mic)
}

fn config() -> StreamingRecognitionConfig {
    StreamingRecognitionConfig::new(16000, "en-US").with_interim_results(true)
}

fn lines_containing(out: &[u8], needle: &str) -> Vec<String> {
    String::from_utf8_lossy(out)
        .lines()
        .filter(|line| line.contains(needle))
        .map(str::to_string)
        .collect()
}

// ==================== Service-ended sessions ====================

#[tokio::test]
async fn test_final_transcript_printed_once() {
    let (_input, mut mic) = open_mic();
    let recognizer = ScriptedRecognizer {
        responses: vec![StreamingRecognizeResponse::single("hello world", true)],
    };
    let mut out = Vec::new();

    let summary = run_session(
        &mut mic,
        &recognizer,
        config(),
        &mut out,
        future::pending::<()>(),
        GRACE,
    )
    .await
    .unwrap();

    assert_eq!(summary.transcripts, 1);
    let lines = lines_containing(&out, "hello world");
    assert_eq!(lines, vec!["✅ You said: hello world".to_string()]);
    assert!(mic.is_closed(), "Session end releases the microphone");
}

#[tokio::test]
async fn test_interim_results_are_not_printed() {
    let (_input, mut mic) = open_mic();
    let recognizer = ScriptedRecognizer {
        responses: vec![
            StreamingRecognizeResponse::single("hello wor", false),
            StreamingRecognizeResponse::default(),
            StreamingRecognizeResponse::single("hello world", true),
            StreamingRecognizeResponse::single("and go", false),
        ],
    };
    let mut out = Vec::new();

    let summary = run_session(
        &mut mic,
        &recognizer,
        config(),
        &mut out,
        future::pending::<()>(),
        GRACE,
    )
    .await
    .unwrap();

    assert_eq!(summary.transcripts, 1);
    assert_eq!(summary.interim, 2);
    assert!(lines_containing(&out, "hello wor").len() == 1);
    assert!(lines_containing(&out, "and go").is_empty());
}

#[tokio::test]
async fn test_recognizer_failure_is_reported() {
    let (input, mut mic) = open_mic();
    let mut out = Vec::new();

    let result = run_session(
        &mut mic,
        &UnreachableRecognizer,
        config(),
        &mut out,
        future::pending::<()>(),
        GRACE,
    )
    .await;

    match result {
        Err(TranscriptionError::Recognition(RecognitionError::ConnectionFailed(msg))) => {
            assert!(msg.contains("refused"));
        }
        other => panic!("Expected ConnectionFailed, got {:?}", other),
    }
    assert!(out.is_empty());
    assert!(input.is_released());
}

// ==================== Operator interrupt ====================

#[tokio::test]
async fn test_interrupt_drains_trailing_results() {
    let (input, mut mic) = open_mic();
    let feeder = input.feeder();
    for _ in 0..3 {
        assert!(feeder.capture(vec![0; 3200]));
    }
    let mut out = Vec::new();

    let result = run_session(
        &mut mic,
        &CountingRecognizer,
        config(),
        &mut out,
        tokio::time::sleep(Duration::from_millis(50)),
        GRACE,
    )
    .await;

    match result {
        Err(TranscriptionError::Interrupted { transcripts }) => assert_eq!(transcripts, 1),
        other => panic!("Expected Interrupted, got {:?}", other),
    }
    assert_eq!(
        lines_containing(&out, "bytes"),
        vec!["✅ You said: 9600 bytes".to_string()]
    );
    assert!(input.is_released());
}

#[tokio::test]
async fn test_interrupt_gives_up_after_grace_period() {
    let (input, mut mic) = open_mic();
    let mut out = Vec::new();
    let grace = Duration::from_millis(100);

    let start = Instant::now();
    let result = run_session(
        &mut mic,
        &StalledRecognizer,
        config(),
        &mut out,
        tokio::time::sleep(Duration::from_millis(20)),
        grace,
    )
    .await;

    assert!(matches!(
        result,
        Err(TranscriptionError::Interrupted { transcripts: 0 })
    ));
    assert!(start.elapsed() >= grace);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(input.is_released());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_audio_after_interrupt_is_discarded() {
    let (input, mut mic) = open_mic();
    let feeder = input.feeder();
    feeder.capture(vec![0; 100]);
    let mut out = Vec::new();

    let result = run_session(
        &mut mic,
        &CountingRecognizer,
        config(),
        &mut out,
        tokio::time::sleep(Duration::from_millis(20)),
        GRACE,
    )
    .await;

    assert!(result.unwrap_err().is_user_interrupt());
    assert!(!feeder.capture(vec![0; 100]));
    mic.capture_handle().on_capture(vec![0; 100]);
    assert_eq!(mic.captured_chunks(), 1);
    assert_eq!(lines_containing(&out, "bytes"), vec!["✅ You said: 100 bytes".to_string()]);
}
