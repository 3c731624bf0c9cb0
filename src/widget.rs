use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::feed::huya::{fetch_channels, HuyaChannels};
use crate::feed::PageSource;
use crate::pool::PoolConfig;
use crate::{FeedError, Result};

const DEFAULT_TITLE: &str = "Huya Channels";
const DEFAULT_COLLAPSE_AFTER: i64 = 5;
const DEFAULT_CACHE_DURATION_SECS: u64 = 10 * 60;

/// Delay before retrying after an update that did not fully succeed.
const EARLY_RETRY: Duration = Duration::from_secs(60);

/// Configuration of a [`HuyaChannelsWidget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WidgetConfig {
    /// Widget title.
    pub title: String,
    /// Room logins to show.
    pub channels: Vec<String>,
    /// Number of channels shown before the rest is collapsed, -1 for never.
    pub collapse_after: i64,
    /// How long fetched data stays fresh, in seconds.
    pub cache_duration_secs: u64,
    /// Worker pool settings for fetching.
    pub pool: PoolConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            title: DEFAULT_TITLE.to_owned(),
            channels: Vec::new(),
            collapse_after: DEFAULT_COLLAPSE_AFTER,
            cache_duration_secs: DEFAULT_CACHE_DURATION_SECS,
            pool: PoolConfig::default(),
        }
    }
}

impl WidgetConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Replaces unusable values with their defaults.
    fn normalized(mut self) -> Self {
        if self.title.is_empty() {
            self.title = DEFAULT_TITLE.to_owned();
        }
        if self.collapse_after == 0 || self.collapse_after < -1 {
            self.collapse_after = DEFAULT_COLLAPSE_AFTER;
        }
        if self.cache_duration_secs == 0 {
            self.cache_duration_secs = DEFAULT_CACHE_DURATION_SECS;
        }
        self
    }
}

/// A widget listing Huya channels sorted by viewers.
///
/// On a failed update the widget keeps showing the channels from its last
/// successful one.
#[derive(Debug)]
pub struct HuyaChannelsWidget {
    config: WidgetConfig,
    channels: HuyaChannels,
    error: Option<String>,
    notice: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    next_update: Option<DateTime<Utc>>,
}

impl HuyaChannelsWidget {
    /// Creates a widget, applying defaults to the configuration.
    pub fn new(config: WidgetConfig) -> Self {
        HuyaChannelsWidget {
            config: config.normalized(),
            channels: HuyaChannels::default(),
            error: None,
            notice: None,
            last_updated: None,
            next_update: None,
        }
    }

    /// Returns the effective configuration.
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Returns the channels from the last applied update.
    pub fn channels(&self) -> &HuyaChannels {
        &self.channels
    }

    /// Returns the error of the last update, if it was rejected.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the notice of the last update, if it was only partial.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns when data was last applied.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Returns true if the widget has never updated or its data is due.
    pub fn requires_update(&self, now: DateTime<Utc>) -> bool {
        self.next_update.map_or(true, |next| now >= next)
    }

    /// Fetches the configured channels and applies them.
    pub fn update<S: PageSource>(&mut self, source: &S) -> Result<()> {
        self.update_at(source, Utc::now())
    }

    /// Like [`update`](Self::update), with an explicit current time.
    ///
    /// Returns the error that made the widget keep its previous channels.
    /// Partial content is applied and reported through [`notice`](Self::notice).
    pub fn update_at<S: PageSource>(&mut self, source: &S, now: DateTime<Utc>) -> Result<()> {
        let (mut channels, summary) = fetch_channels(source, &self.config.channels, &self.config.pool);

        match summary {
            Ok(()) => {
                self.error = None;
                self.notice = None;
                self.schedule(now, self.cache_duration());
            }
            Err(e @ FeedError::PartialContent { .. }) => {
                warn!("{}: {}", self.config.title, e);
                self.error = None;
                self.notice = Some(e.to_string());
                self.schedule(now, self.retry_delay());
            }
            Err(e) => {
                error!("{}: {}, keeping previous channels", self.config.title, e);
                self.error = Some(e.to_string());
                self.notice = None;
                self.schedule(now, self.retry_delay());
                return Err(e);
            }
        }

        channels.sort_by_viewers();
        info!("{}: {} channels updated", self.config.title, channels.len());
        self.channels = channels;
        self.last_updated = Some(now);
        Ok(())
    }

    /// Renders the channel list as plain text, one channel per line.
    ///
    /// Channels past `collapse_after` are summarized in a trailing line.
    pub fn render_text(&self) -> String {
        let shown = match usize::try_from(self.config.collapse_after) {
            Ok(limit) => limit.min(self.channels.len()),
            Err(_) => self.channels.len(),
        };

        let mut out = format!("{}\n", self.config.title);
        for channel in &self.channels[..shown] {
            let name = if channel.name.is_empty() {
                &channel.room_id
            } else {
                &channel.name
            };
            if channel.is_live {
                out.push_str(&format!(
                    "  {name} - LIVE, {} viewers, {}\n",
                    channel.viewers_count, channel.category
                ));
            } else {
                out.push_str(&format!("  {name} - offline\n"));
            }
        }
        if shown < self.channels.len() {
            out.push_str(&format!("  ... {} more\n", self.channels.len() - shown));
        }
        out
    }

    fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.config.cache_duration_secs)
    }

    fn retry_delay(&self) -> Duration {
        EARLY_RETRY.min(self.cache_duration())
    }

    fn schedule(&mut self, now: DateTime<Utc>, after: Duration) {
        self.next_update = chrono::Duration::from_std(after)
            .ok()
            .and_then(|after| now.checked_add_signed(after));
    }
}
