/// Message types for streaming speech recognition
///
/// The client sends one `streaming_config` message, then any number of
/// `audio_content` messages carrying Base64-encoded LINEAR16 audio, then
/// `end_of_stream`. The server answers with `StreamingRecognizeResponse`
/// objects in order.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

// ============================================================================
// Client -> Server Messages
// ============================================================================

/// Audio encoding of the submitted content
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    /// Uncompressed 16-bit signed little-endian PCM
    #[default]
    Linear16,
}

/// Recognition parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    /// Audio encoding (always LINEAR16)
    pub encoding: AudioEncoding,

    /// Sample rate of the submitted audio in Hz
    pub sample_rate_hertz: u32,

    /// BCP-47 language tag (e.g. "en-US")
    pub language_code: String,

    /// Whether the service should insert punctuation
    pub enable_automatic_punctuation: bool,
}

/// Configuration sent once at the start of a streaming session
///
/// # Example
/// ```
/// use micscribe_lib::recognition::StreamingRecognitionConfig;
///
/// let config = StreamingRecognitionConfig::new(16000, "en-US")
///     .with_automatic_punctuation(true)
///     .with_interim_results(true);
///
/// assert_eq!(config.config.sample_rate_hertz, 16000);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StreamingRecognitionConfig {
    /// Recognition parameters
    pub config: RecognitionConfig,

    /// Whether provisional results are returned before finalization
    pub interim_results: bool,
}

impl StreamingRecognitionConfig {
    /// Create a LINEAR16 configuration for the given rate and language
    pub fn new(sample_rate_hertz: u32, language_code: impl Into<String>) -> Self {
        Self {
            config: RecognitionConfig {
                encoding: AudioEncoding::Linear16,
                sample_rate_hertz,
                language_code: language_code.into(),
                enable_automatic_punctuation: false,
            },
            interim_results: false,
        }
    }

    /// Enable or disable automatic punctuation
    pub fn with_automatic_punctuation(mut self, enabled: bool) -> Self {
        self.config.enable_automatic_punctuation = enabled;
        self
    }

    /// Enable or disable interim results
    pub fn with_interim_results(mut self, enabled: bool) -> Self {
        self.interim_results = enabled;
        self
    }
}

/// Messages sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Session configuration, always first
    StreamingConfig {
        /// Streaming parameters
        streaming_config: StreamingRecognitionConfig,
    },

    /// A block of audio
    AudioContent {
        /// Base64-encoded PCM bytes
        audio_content: String,
    },

    /// No more audio will follow
    EndOfStream,
}

impl ClientMessage {
    /// Build the configuration message
    pub fn config(streaming_config: StreamingRecognitionConfig) -> Self {
        ClientMessage::StreamingConfig { streaming_config }
    }

    /// Build an audio message from raw PCM bytes
    pub fn audio(pcm: &[u8]) -> Self {
        ClientMessage::AudioContent {
            audio_content: STANDARD.encode(pcm),
        }
    }

    /// Decode the PCM bytes carried by an audio message
    pub fn audio_bytes(&self) -> Option<Vec<u8>> {
        match self {
            ClientMessage::AudioContent { audio_content } => STANDARD.decode(audio_content).ok(),
            _ => None,
        }
    }
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

/// One streaming response from the recognition service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StreamingRecognizeResponse {
    /// Results, most relevant first
    #[serde(default)]
    pub results: Vec<StreamingRecognitionResult>,

    /// Set when the service aborts the stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceStatus>,
}

impl StreamingRecognizeResponse {
    /// Response carrying a single result with one alternative
    pub fn single(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            results: vec![StreamingRecognitionResult {
                alternatives: vec![SpeechRecognitionAlternative {
                    transcript: transcript.into(),
                    confidence: 0.0,
                }],
                is_final,
                stability: 0.0,
            }],
            error: None,
        }
    }

    /// Transcript of the top alternative, if the first result is final
    pub fn final_transcript(&self) -> Option<&str> {
        let result = self.results.first()?;
        if !result.is_final {
            return None;
        }
        result.alternatives.first().map(|alt| alt.transcript.as_str())
    }
}

/// A recognition result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct StreamingRecognitionResult {
    /// Alternative hypotheses, most likely first
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,

    /// Whether the service will not revise this result further
    #[serde(default)]
    pub is_final: bool,

    /// Likelihood that an interim result will not change (0.0 - 1.0)
    #[serde(default)]
    pub stability: f32,
}

/// One transcript hypothesis
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SpeechRecognitionAlternative {
    /// Recognized text
    pub transcript: String,

    /// Confidence estimate (0.0 - 1.0), usually only set on final results
    #[serde(default)]
    pub confidence: f32,
}

/// Error reported by the service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceStatus {
    /// Numeric status code
    #[serde(default)]
    pub code: i32,

    /// Human-readable description
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streaming_config_defaults() {
        let config = StreamingRecognitionConfig::new(16000, "en-US");

        assert_eq!(config.config.encoding, AudioEncoding::Linear16);
        assert_eq!(config.config.sample_rate_hertz, 16000);
        assert_eq!(config.config.language_code, "en-US");
        assert!(!config.config.enable_automatic_punctuation);
        assert!(!config.interim_results);
    }

    #[test]
    fn test_config_message_serialization() {
        let config = StreamingRecognitionConfig::new(16000, "en-US")
            .with_automatic_punctuation(true)
            .with_interim_results(true);

        let json = serde_json::to_string(&ClientMessage::config(config)).unwrap();

        assert!(json.contains("\"message_type\":\"streaming_config\""));
        assert!(json.contains("\"encoding\":\"LINEAR16\""));
        assert!(json.contains("\"sample_rate_hertz\":16000"));
        assert!(json.contains("\"enable_automatic_punctuation\":true"));
        assert!(json.contains("\"interim_results\":true"));
    }

    #[test]
    fn test_audio_message() {
        let msg = ClientMessage::audio(&[0x01, 0x02, 0x03, 0x04]);

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"message_type\":\"audio_content\""));
        assert!(json.contains("\"audio_content\":\"AQIDBA==\""));

        assert_eq!(msg.audio_bytes(), Some(vec![0x01, 0x02, 0x03, 0x04]));
    }

    #[test]
    fn test_end_of_stream_message() {
        let json = serde_json::to_string(&ClientMessage::EndOfStream).unwrap();
        assert_eq!(json, "{\"message_type\":\"end_of_stream\"}");
        assert_eq!(ClientMessage::EndOfStream.audio_bytes(), None);
    }

    #[test]
    fn test_response_final_transcript() {
        let json = r#"{
            "results": [
                {
                    "alternatives": [
                        { "transcript": "hello world", "confidence": 0.92 },
                        { "transcript": "hello word" }
                    ],
                    "is_final": true
                }
            ]
        }"#;

        let response: StreamingRecognizeResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.final_transcript(), Some("hello world"));
        assert_eq!(response.results[0].alternatives.len(), 2);
        assert_eq!(response.results[0].alternatives[1].confidence, 0.0);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_response_interim_has_no_final_transcript() {
        let json = r#"{
            "results": [
                { "alternatives": [ { "transcript": "hel" } ], "stability": 0.2 }
            ]
        }"#;

        let response: StreamingRecognizeResponse = serde_json::from_str(json).unwrap();

        assert!(!response.results[0].is_final);
        assert_eq!(response.final_transcript(), None);
    }

    #[test]
    fn test_response_empty_results() {
        let response: StreamingRecognizeResponse = serde_json::from_str("{}").unwrap();

        assert!(response.results.is_empty());
        assert_eq!(response.final_transcript(), None);
    }

    #[test]
    fn test_response_final_without_alternatives() {
        let response = StreamingRecognizeResponse {
            results: vec![StreamingRecognitionResult {
                is_final: true,
                ..Default::default()
            }],
            error: None,
        };

        assert_eq!(response.final_transcript(), None);
    }

    #[test]
    fn test_response_error() {
        let json = r#"{ "error": { "code": 3, "message": "Invalid audio" } }"#;

        let response: StreamingRecognizeResponse = serde_json::from_str(json).unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, 3);
        assert_eq!(error.message, "Invalid audio");
    }

    #[test]
    fn test_single_response_builder() {
        let response = StreamingRecognizeResponse::single("testing", true);
        assert_eq!(response.final_transcript(), Some("testing"));

        let interim = StreamingRecognizeResponse::single("test", false);
        assert_eq!(interim.final_transcript(), None);
    }
}
