use std::io::Cursor;

use thiserror::Error;

/// Supported chunk encodings. Browser recorders emit WebM/Ogg containers;
/// native clients may stream WAV, MP3 or raw 16 kHz mono s16le PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Webm,
    Ogg,
    Wav,
    Mp3,
    Pcm16,
}

impl AudioEncoding {
    pub fn parse(value: &str) -> Result<Self, DecodeError> {
        match value {
            "webm" => Ok(AudioEncoding::Webm),
            "ogg" => Ok(AudioEncoding::Ogg),
            "wav" => Ok(AudioEncoding::Wav),
            "mp3" => Ok(AudioEncoding::Mp3),
            "pcm16" => Ok(AudioEncoding::Pcm16),
            other => Err(DecodeError::UnsupportedEncoding(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Webm => "webm",
            AudioEncoding::Ogg => "ogg",
            AudioEncoding::Wav => "wav",
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Pcm16 => "pcm16",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            AudioEncoding::Webm => "audio/webm",
            AudioEncoding::Ogg => "audio/ogg",
            AudioEncoding::Wav => "audio/wav",
            AudioEncoding::Mp3 => "audio/mpeg",
            AudioEncoding::Pcm16 => "application/octet-stream",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            AudioEncoding::Webm => "webm",
            AudioEncoding::Ogg => "ogg",
            AudioEncoding::Wav => "wav",
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Pcm16 => "pcm",
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Expected, frequent case (trailing recorder silence); dropped without
    /// surfacing an error to anyone.
    #[error("chunk below minimum useful size ({0} bytes)")]
    TooSmall(usize),
    #[error("chunk does not look like {0}")]
    BadHeader(&'static str),
    #[error("corrupt wav chunk: {0}")]
    CorruptWav(String),
    #[error("pcm16 chunk has an odd byte length")]
    MisalignedPcm,
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

/// A validated, normalized audio unit ready for the pipeline.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub bytes: Vec<u8>,
    pub encoding: AudioEncoding,
}

impl DecodedAudio {
    pub fn mime(&self) -> &'static str {
        self.encoding.mime()
    }

    pub fn file_extension(&self) -> &'static str {
        self.encoding.file_extension()
    }
}

const WEBM_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3]; // EBML header
const OGG_MAGIC: &[u8; 4] = b"OggS";
const ID3_MAGIC: &[u8; 3] = b"ID3";

/// Validates raw chunk bytes against their declared encoding.
///
/// Stateless and pure: the same bytes always produce the same outcome.
pub fn decode(
    bytes: Vec<u8>,
    encoding: AudioEncoding,
    min_bytes: usize,
) -> Result<DecodedAudio, DecodeError> {
    if bytes.len() < min_bytes {
        return Err(DecodeError::TooSmall(bytes.len()));
    }

    match encoding {
        AudioEncoding::Webm => {
            if !bytes.starts_with(&WEBM_MAGIC) {
                return Err(DecodeError::BadHeader("webm"));
            }
        }
        AudioEncoding::Ogg => {
            if !bytes.starts_with(OGG_MAGIC) {
                return Err(DecodeError::BadHeader("ogg"));
            }
        }
        AudioEncoding::Mp3 => {
            // ID3 tag or a bare MPEG frame sync.
            let frame_sync = bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0;
            if !bytes.starts_with(ID3_MAGIC) && !frame_sync {
                return Err(DecodeError::BadHeader("mp3"));
            }
        }
        AudioEncoding::Wav => {
            let reader = hound::WavReader::new(Cursor::new(&bytes))
                .map_err(|e| DecodeError::CorruptWav(e.to_string()))?;
            let spec = reader.spec();
            if spec.channels == 0 || spec.sample_rate == 0 {
                return Err(DecodeError::CorruptWav("empty format header".to_string()));
            }
        }
        AudioEncoding::Pcm16 => {
            if bytes.len() % 2 != 0 {
                return Err(DecodeError::MisalignedPcm);
            }
        }
    }

    Ok(DecodedAudio { bytes, encoding })
}
