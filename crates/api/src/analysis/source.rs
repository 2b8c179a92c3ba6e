use reqwest::Url;

use super::AnalysisError;

/// Extensions fetched directly instead of going through the extractor.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg", "aac"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// The URL points at an audio file; `extension` is lowercase, without the dot.
    Direct { extension: String },
    /// Anything else: a page or video the extractor has to pull audio from.
    Page,
}

impl AudioSource {
    pub fn classify(url: &Url) -> Self {
        let last_segment = url.path().rsplit('/').next().unwrap_or_default();

        match last_segment.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                    AudioSource::Direct { extension: ext }
                } else {
                    AudioSource::Page
                }
            }
            None => AudioSource::Page,
        }
    }
}

/// Parse a user-supplied URL. Only http and https are accepted; the URL is later
/// handed to a download client and to the extractor, neither of which should see
/// local files.
pub fn parse_media_url(raw: &str) -> Result<Url, AnalysisError> {
    let url = Url::parse(raw.trim()).map_err(|err| AnalysisError::InvalidUrl(err.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AnalysisError::InvalidUrl(format!(
            "unsupported scheme: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> AudioSource {
        AudioSource::classify(&Url::parse(raw).unwrap())
    }

    #[test]
    fn audio_extensions_are_direct() {
        for ext in AUDIO_EXTENSIONS {
            assert_eq!(
                classify(&format!("https://cdn.example.com/a/clip.{ext}")),
                AudioSource::Direct {
                    extension: ext.to_string()
                }
            );
        }
    }

    #[test]
    fn extension_match_ignores_case_and_query() {
        assert_eq!(
            classify("https://cdn.example.com/Voice.MP3?sig=abc.wav"),
            AudioSource::Direct {
                extension: "mp3".into()
            }
        );
    }

    #[test]
    fn pages_and_video_files_need_extraction() {
        assert_eq!(classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), AudioSource::Page);
        assert_eq!(classify("https://www.instagram.com/reel/abc/"), AudioSource::Page);
        assert_eq!(classify("https://cdn.example.com/clip.mp4"), AudioSource::Page);
        assert_eq!(classify("https://example.com"), AudioSource::Page);
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_media_url("https://example.com/a.wav").is_ok());
        assert!(parse_media_url("  http://example.com/watch  ").is_ok());

        assert!(matches!(
            parse_media_url("file:///etc/passwd"),
            Err(AnalysisError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_media_url("not a url"),
            Err(AnalysisError::InvalidUrl(_))
        ));
    }
}
