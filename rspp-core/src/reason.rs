//! The closed set of outcome reason strings (§7).
//!
//! `Outcome::reason` and `StreamChunk::error_reason` are free-form `String`s
//! at the type level, but every producer in this workspace draws from this
//! fixed vocabulary so that downstream consumers can match on a known set.

/// The attempt exceeded its deadline.
pub const PROVIDER_TIMEOUT: &str = "provider_timeout";
/// The provider signaled it is overloaded (e.g. HTTP 429).
pub const PROVIDER_OVERLOAD: &str = "provider_overload";
/// The attempt was rejected on authentication or policy grounds (401/403).
pub const PROVIDER_AUTH_OR_POLICY_BLOCK: &str = "provider_auth_or_policy_block";
/// Any other non-retryable 4xx.
pub const PROVIDER_CLIENT_ERROR: &str = "provider_client_error";
/// A 5xx response.
pub const PROVIDER_SERVER_ERROR: &str = "provider_server_error";
/// A transport-level fault (connection reset, DNS, TLS, etc).
pub const PROVIDER_TRANSPORT_ERROR: &str = "provider_transport_error";
/// The attempt was cancelled before or during the call.
pub const PROVIDER_CANCELLED: &str = "provider_cancelled";
/// A TTS provider returned a successful response with no audio bytes.
pub const PROVIDER_EMPTY_AUDIO: &str = "provider_empty_audio";
/// The stream endpoint returned a non-2xx response.
pub const PROVIDER_STREAM_HTTP_ERROR: &str = "provider_stream_http_error";
/// The stream body could not be parsed per the provider's wire format.
pub const PROVIDER_STREAM_PARSE_ERROR: &str = "provider_stream_parse_error";
/// The response body could not be read to completion.
pub const PROVIDER_RESPONSE_READ_ERROR: &str = "provider_response_read_error";
/// The response body was read but failed to parse as JSON.
pub const PROVIDER_RESPONSE_PARSE_ERROR: &str = "provider_response_parse_error";
/// An async-poll provider's submission response carried no transcript id.
pub const PROVIDER_TRANSCRIPT_ID_MISSING: &str = "provider_transcript_id_missing";
/// An async-poll provider reached a terminal failure status.
pub const PROVIDER_TRANSCRIPTION_FAILED: &str = "provider_transcription_failed";
/// The raw audio byte stream could not be read to completion.
pub const PROVIDER_AUDIO_STREAM_READ_ERROR: &str = "provider_audio_stream_read_error";
/// An audio chunk failed to decode.
pub const PROVIDER_AUDIO_DECODE_ERROR: &str = "provider_audio_decode_error";
/// The adapter was invoked with no endpoint configured.
pub const PROVIDER_ENDPOINT_MISSING: &str = "provider_endpoint_missing";
/// A catch-all for stream faults not otherwise classified.
pub const PROVIDER_STREAM_ERROR: &str = "provider_stream_error";
