use crate::decoder::AudioEncoding;

/// Tuning knobs for the interpretation pipeline.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Declared encoding of inbound chunks, negotiated with the client
    /// recorder out of band.
    pub encoding: AudioEncoding,
    /// Chunks under this size are trailing silence from the recorder and are
    /// skipped without error.
    pub min_chunk_bytes: usize,
    /// Transcriptions below this confidence produce no result.
    pub min_confidence: f64,
    /// A detected language overrides the mode's source language when
    /// transcription confidence exceeds this threshold.
    pub detect_override_confidence: f64,
    /// Concurrent transcription calls across all sessions.
    pub max_concurrent_transcriptions: usize,
    /// Chunks allowed to wait for a transcription slot; beyond this the
    /// chunk is dropped rather than queued.
    pub transcription_queue_limit: usize,
    /// Per-session chunk buffer between the socket reader and the worker.
    pub chunk_queue_capacity: usize,
    /// Tail of the previous chunk replayed ahead of the next one to recover
    /// words cut at chunk boundaries. Byte-level stitching is only sound for
    /// raw pcm16 streams; for container encodings this is a no-op.
    pub chunk_overlap_ms: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::Webm,
            min_chunk_bytes: 100,
            min_confidence: 0.3,
            detect_override_confidence: 0.5,
            max_concurrent_transcriptions: 2,
            transcription_queue_limit: 8,
            chunk_queue_capacity: 32,
            chunk_overlap_ms: 0,
        }
    }
}
