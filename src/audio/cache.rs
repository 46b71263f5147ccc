use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CLIP_EXTENSION: &str = "mp3";

/// Content-addressed store of synthesized clips keyed by voice, rate and text.
#[derive(Debug, Clone)]
pub struct VoiceCache {
    dir: PathBuf,
    enabled: bool,
}

impl VoiceCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Where a clip for this utterance lives, whether or not it exists yet.
    pub fn path_for(&self, voice: &str, rate: &str, text: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{CLIP_EXTENSION}", cache_key(voice, rate, text)))
    }

    /// Existing clip for this utterance, if caching is on.
    pub fn lookup(&self, voice: &str, rate: &str, text: &str) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        let path = self.path_for(voice, rate, text);
        path.is_file().then_some(path)
    }
}

pub fn cache_key(voice: &str, rate: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"tts:");
    hasher.update(voice.as_bytes());
    hasher.update(b":");
    hasher.update(rate.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_every_component() {
        let base = cache_key("voice-a", "+0%", "hello");
        assert_eq!(base, cache_key("voice-a", "+0%", "hello"));
        assert_ne!(base, cache_key("voice-b", "+0%", "hello"));
        assert_ne!(base, cache_key("voice-a", "+10%", "hello"));
        assert_ne!(base, cache_key("voice-a", "+0%", "hello!"));
        assert_eq!(base.len(), 64);
    }

    #[test]
    fn lookup_respects_enabled_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = VoiceCache::new(dir.path(), true);
        assert!(cache.lookup("v", "+0%", "hi").is_none());

        let path = cache.path_for("v", "+0%", "hi");
        fs::write(&path, b"clip").unwrap();
        assert_eq!(cache.lookup("v", "+0%", "hi"), Some(path));

        cache.set_enabled(false);
        assert!(cache.lookup("v", "+0%", "hi").is_none());
    }
}
