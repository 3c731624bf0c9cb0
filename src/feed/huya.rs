use std::ops::Deref;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use super::PageSource;
use crate::pool::{execute, Job, PoolConfig};
use crate::{FeedError, Result};

const BASE_URL: &str = "https://m.huya.com";

/// Upstream live status of a room that is currently streaming.
const LIVE_STATUS_LIVE: i64 = 2;

/// Metadata of a single Huya room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HuyaChannel {
    /// Lower-cased room login.
    pub room_id: String,
    /// Whether the room was found upstream.
    pub exists: bool,
    /// Display name (the room introduction).
    pub name: String,
    /// Avatar image URL.
    pub avatar_url: String,
    /// Whether the room is streaming right now.
    pub is_live: bool,
    /// Start of the current or last stream.
    pub live_since: DateTime<Utc>,
    /// Full category name.
    pub category: String,
    /// Category identifier used in URLs.
    pub category_slug: String,
    /// Current number of viewers.
    pub viewers_count: u64,
}

/// A list of Huya channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HuyaChannels(Vec<HuyaChannel>);

impl HuyaChannels {
    /// Sorts channels by viewer count, highest first.
    ///
    /// The sort is stable, so channels with equal counts keep their order.
    pub fn sort_by_viewers(&mut self) {
        self.0.sort_by(|a, b| b.viewers_count.cmp(&a.viewers_count));
    }

    /// Returns the underlying list.
    pub fn into_inner(self) -> Vec<HuyaChannel> {
        self.0
    }
}

impl From<Vec<HuyaChannel>> for HuyaChannels {
    fn from(channels: Vec<HuyaChannel>) -> Self {
        HuyaChannels(channels)
    }
}

impl Deref for HuyaChannels {
    type Target = [HuyaChannel];

    fn deref(&self) -> &[HuyaChannel] {
        &self.0
    }
}

#[derive(Deserialize)]
struct StreamMetadata {
    #[serde(rename = "roomInfo")]
    room_info: Option<RoomInfo>,
}

#[derive(Deserialize)]
struct RoomInfo {
    #[serde(rename = "eLiveStatus", default, deserialize_with = "null_as_default")]
    live_status: i64,
    #[serde(rename = "tLiveInfo")]
    live_info: Option<LiveInfo>,
}

// Upstream sends `null` for unset fields; those read as the zero value.
#[derive(Deserialize, Default)]
#[serde(default)]
struct LiveInfo {
    #[serde(rename = "lUserCount", deserialize_with = "null_as_default")]
    user_count: i64,
    #[serde(rename = "sAvatar180", deserialize_with = "null_as_default")]
    avatar: String,
    #[serde(rename = "sIntroduction", deserialize_with = "null_as_default")]
    introduction: String,
    #[serde(rename = "sGameFullName", deserialize_with = "null_as_default")]
    game_full_name: String,
    #[serde(rename = "sGameHostName", deserialize_with = "null_as_default")]
    game_host_name: String,
    #[serde(rename = "iStartTime", deserialize_with = "null_as_default")]
    start_time: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn metadata_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"window\.HNF_GLOBAL_INIT.=.\{(.*?)\}.</script>")
            .expect("metadata pattern is a valid regex")
    })
}

/// Returns the page URL of a room.
pub fn channel_url(channel: &str) -> String {
    format!("{BASE_URL}/{channel}")
}

/// Parses a room page into a channel record.
///
/// The page embeds its state as a JSON object assigned to
/// `window.HNF_GLOBAL_INIT`; only `roomInfo` is decoded.
pub fn parse_channel(channel: &str, html: &str) -> Result<HuyaChannel> {
    let body = metadata_pattern()
        .captures(html)
        .and_then(|captures| captures.get(1))
        .ok_or(FeedError::MetadataNotFound)?
        .as_str();

    let metadata: StreamMetadata = serde_json::from_str(&format!("{{{body}}}"))?;
    let room = metadata
        .room_info
        .ok_or(FeedError::MissingField("roomInfo"))?;
    let live = room
        .live_info
        .ok_or(FeedError::MissingField("roomInfo.tLiveInfo"))?;

    Ok(HuyaChannel {
        room_id: channel.to_lowercase(),
        exists: true,
        name: live.introduction,
        avatar_url: live.avatar,
        is_live: room.live_status == LIVE_STATUS_LIVE,
        live_since: DateTime::from_timestamp(live.start_time, 0).unwrap_or_default(),
        category: live.game_full_name,
        category_slug: live.game_host_name,
        viewers_count: u64::try_from(live.user_count).unwrap_or(0),
    })
}

/// Fetches and parses a single room.
pub fn fetch_channel<S: PageSource>(source: &S, channel: &str) -> Result<HuyaChannel> {
    let html = source.fetch_page(&channel_url(channel))?;
    parse_channel(channel, &html)
}

/// Fetches every room concurrently.
///
/// Returns the rooms that could be fetched, in request order, together with
/// the batch summary: `Ok` when all succeeded, [`FeedError::NoContent`]
/// when none did, [`FeedError::PartialContent`] otherwise.
pub fn fetch_channels<S: PageSource>(
    source: &S,
    logins: &[String],
    config: &PoolConfig,
) -> (HuyaChannels, Result<()>) {
    let job = Job::with_config(
        |login: &String| fetch_channel(source, login),
        logins.to_vec(),
        config,
    );
    let (channels, summary) = execute(job).into_successes(logins, "huya channel");
    (HuyaChannels(channels), summary)
}
