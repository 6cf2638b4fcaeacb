use std::env;
use std::time::Duration;

use async_trait::async_trait;
use lazy_regex::{Lazy, regex};
use regex::Regex;
use tap::TapFallible;
use tracing::{error, info};
use which::which;
use youtube_dl::{SingleVideo, YoutubeDl, YoutubeDlOutput};

use super::{ResolveError, TrackResolver};
use crate::dto::track::{AudioHandle, Metadata, Track};

macro_rules! locator_regex {
    ($s:expr) => {
        Lazy::force(regex!($s)).clone()
    };
}

fn youtube() -> Regex {
    locator_regex!(r"^https?://(www\.|m\.|music\.)?youtube\.com/")
}

fn youtu_be() -> Regex {
    locator_regex!(r"^https?://(www\.)?youtu\.be/")
}

struct LocatorRules {
    regexes: Vec<Regex>,
}

impl LocatorRules {
    fn new(regexes: Vec<Regex>) -> Self {
        Self { regexes }
    }

    fn matches(&self, locator: &str) -> bool {
        self.regexes.iter().any(|r| r.is_match(locator))
    }
}

fn find_exe(env_var: &str, exe_name: &str) -> Result<String, ResolveError> {
    let path = env::var(env_var)
        .or_else(|_| which(exe_name).map(|p| p.to_string_lossy().to_string()))
        .map_err(|_| ResolveError::Extraction(format!("{exe_name} executable not found")))?;

    info!("Using {exe_name} path: {path:?}");
    Ok(path)
}

fn ytdl_exe() -> Result<String, ResolveError> {
    find_exe("YT_DLP_PATH", "yt-dlp").tap_err(|e| error!("yt-dlp path not found: {e:?}"))
}

/// Resolves YouTube locators to direct audio stream handles via yt-dlp.
pub struct YtDlpResolver {
    rules: LocatorRules,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self {
            rules: LocatorRules::new(vec![youtube(), youtu_be()]),
        }
    }

    fn video_to_track(&self, video: SingleVideo) -> Result<Track, ResolveError> {
        let handle = video
            .url
            .map(AudioHandle)
            .ok_or_else(|| ResolveError::Extraction("no streamable url in output".to_owned()))?;
        let title = video
            .title
            .unwrap_or_else(|| "unknown title".to_owned());
        let duration = video
            .duration
            .and_then(|d| d.as_f64())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Ok(Track {
            title,
            handle,
            metadata: Metadata {
                uploader: video.uploader,
                webpage_url: video.webpage_url,
                duration,
            },
        })
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, locator: &str) -> Result<Track, ResolveError> {
        if !self.rules.matches(locator) {
            return Err(ResolveError::InvalidLocator(locator.to_owned()));
        }

        info!("extracting metadata for {locator} - this may take a few seconds");
        let mut command = YoutubeDl::new(locator);
        command.youtube_dl_path(ytdl_exe()?);
        command.format("bestaudio/best");
        let output = command
            .run_async()
            .await
            .tap_err(|e| error!("error running yt-dlp: {e}"))
            .map_err(|e| ResolveError::Extraction(e.to_string()))?;
        info!("metadata extraction complete");

        match output {
            YoutubeDlOutput::SingleVideo(video) => {
                info!("found single video: {:?}", video.title);
                self.video_to_track(*video)
            }
            YoutubeDlOutput::Playlist(playlist) => {
                info!("found playlist: {:?}", playlist.title);
                // Take the first entry, the rest of the playlist is ignored.
                let first = playlist
                    .entries
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolveError::Extraction("playlist has no entries".to_owned()))?;
                self.video_to_track(first)
            }
        }
    }
}
