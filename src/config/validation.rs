use super::defaults::{
    MAX_AUTO_DISMISS_SECS, MAX_IDLE_THRESHOLD_SECS, MAX_JITTER_SECS, MAX_RUN_SECS,
    MAX_TTS_TIMEOUT_SECS, MAX_VOICE_NAME_LEN, MIN_AUTO_DISMISS_SECS, MIN_IDLE_THRESHOLD_SECS, PLAYER_BINARIES,
    TTS_BINARIES,
};
use super::AppConfig;
use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use regex::Regex;
use std::{fs, path::Path, sync::OnceLock};

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize helper commands and paths.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_IDLE_THRESHOLD_SECS..=MAX_IDLE_THRESHOLD_SECS).contains(&self.idle_threshold_secs)
        {
            bail!(
                "--idle-threshold-secs must be between {MIN_IDLE_THRESHOLD_SECS} and {MAX_IDLE_THRESHOLD_SECS}, got {}",
                self.idle_threshold_secs
            );
        }
        for (flag, value) in [
            ("--jitter-min-secs", self.jitter_min_secs),
            ("--jitter-max-secs", self.jitter_max_secs),
        ] {
            if !(-MAX_JITTER_SECS..=MAX_JITTER_SECS).contains(&value) {
                bail!("{flag} must be between -{MAX_JITTER_SECS} and {MAX_JITTER_SECS}, got {value}");
            }
        }
        if self.jitter_min_secs > self.jitter_max_secs {
            bail!(
                "--jitter-min-secs ({}) cannot exceed --jitter-max-secs ({})",
                self.jitter_min_secs,
                self.jitter_max_secs
            );
        }
        if !(MIN_AUTO_DISMISS_SECS..=MAX_AUTO_DISMISS_SECS).contains(&self.auto_dismiss_secs) {
            bail!(
                "--auto-dismiss-secs must be between {MIN_AUTO_DISMISS_SECS} and {MAX_AUTO_DISMISS_SECS}, got {}",
                self.auto_dismiss_secs
            );
        }
        if !(1..=60).contains(&self.camera_fps) {
            bail!("--camera-fps must be between 1 and 60, got {}", self.camera_fps);
        }
        if !(1..=MAX_TTS_TIMEOUT_SECS).contains(&self.tts_timeout_secs) {
            bail!(
                "--tts-timeout-secs must be between 1 and {MAX_TTS_TIMEOUT_SECS}, got {}",
                self.tts_timeout_secs
            );
        }
        if let Some(secs) = self.run_secs {
            if secs == 0 || secs > MAX_RUN_SECS {
                bail!("--run-secs must be between 1 and {MAX_RUN_SECS}, got {secs}");
            }
        }

        // Camera access needs an explicit opt-in on top of the feature flag.
        if self.camera && !self.camera_consent {
            log_debug("camera requested without --camera-consent; keeping it disabled");
            self.camera = false;
        }

        let voice = self.tts_voice.trim();
        if voice.is_empty()
            || voice.len() > MAX_VOICE_NAME_LEN
            || !voice
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            bail!(
                "--tts-voice must be 1-{MAX_VOICE_NAME_LEN} characters of letters, digits, '-' or '_'"
            );
        }
        self.tts_voice = voice.to_string();

        if !rate_pattern().is_match(self.tts_rate.trim()) {
            bail!(
                "--tts-rate must look like +0% or -15%, got '{}'",
                self.tts_rate
            );
        }
        self.tts_rate = self.tts_rate.trim().to_string();

        if let Some(raw) = self.tts_cmd.as_deref() {
            self.tts_argv = split_command(raw, "--tts-cmd", TTS_BINARIES)?;
        }
        if let Some(raw) = self.player_cmd.as_deref() {
            self.player_argv = split_command(raw, "--player-cmd", PLAYER_BINARIES)?;
        }

        if let Some(dir) = &self.content_dir {
            let canonical = dir
                .canonicalize()
                .with_context(|| format!("failed to canonicalize --content-dir '{}'", dir.display()))?;
            if !canonical.is_dir() {
                bail!("--content-dir '{}' is not a directory", canonical.display());
            }
            self.content_dir = Some(canonical);
        }

        if let Some(dir) = &self.voice_cache_dir {
            if dir.exists() && !dir.is_dir() {
                bail!("--voice-cache-dir '{}' is not a directory", dir.display());
            }
        }

        Ok(())
    }
}

fn rate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]\d{1,3}%$").expect("rate regex should compile"))
}

/// Split a helper command line and check its binary against the allowlist.
pub(super) fn split_command(raw: &str, flag: &str, allowlist: &[&str]) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    let mut parts =
        shell_words::split(trimmed).with_context(|| format!("{flag} has unbalanced quoting"))?;
    if parts.is_empty() {
        bail!("{flag} cannot be empty");
    }
    parts[0] = sanitize_binary(&parts[0], flag, allowlist)?;
    Ok(parts)
}

/// Allow either a known binary name or an absolute path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must be one of {allowlist:?} or an existing binary path");
}
