use crate::error::ParseError;
use crate::youtube::youtube::video_id_from_url;
use chrono::Utc;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

pub const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";
pub const INITIAL_DATA_MARKER: &str = "ytInitialData";

/// The two embedded json blobs a watch page carries, plus the url they were
/// scraped from.
#[derive(Debug, Clone)]
pub struct VideoData {
    pub url: String,
    pub player_response: Value,
    pub initial_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoStatus {
    Ok,
    Error,
    Private,
    AgeRestricted,
    Unplayable,
    LiveStreamOffline,
    LoginRequired,
    #[serde(untagged)]
    Other(String),
}

impl VideoStatus {
    fn from_upstream(status: &str) -> Self {
        match status {
            "OK" => VideoStatus::Ok,
            "ERROR" => VideoStatus::Error,
            "UNPLAYABLE" => VideoStatus::Unplayable,
            "LIVE_STREAM_OFFLINE" => VideoStatus::LiveStreamOffline,
            "LOGIN_REQUIRED" => VideoStatus::LoginRequired,
            other => VideoStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub start_time_millis: u64,
}

/// The subset of embedded metadata the extractor recognizes. Every field
/// beyond `status` and `timestamp` is best-effort: absent from the payload
/// means absent here, never an error. The upstream blob is not a documented
/// contract, so treat this as a versioned mapping rather than a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub status: VideoStatus,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_content: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_safe: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlisted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl VideoInfo {
    fn new(status: VideoStatus) -> Self {
        Self {
            status,
            timestamp: Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            id: None,
            author: None,
            channel_id: None,
            title: None,
            description: None,
            length_seconds: None,
            publish_date: None,
            upload_date: None,
            live_content: None,
            chat_available: None,
            average_rating: None,
            views: None,
            family_safe: None,
            keywords: None,
            chapters: None,
            likes: None,
            dislikes: None,
            unlisted: None,
            category: None,
            start_time: None,
            end_time: None,
        }
    }
}

/// Returns the balanced `{...}` object at the start of `text`, tracking
/// nesting depth with a string- and escape-aware scan. The payload length is
/// unbounded, so a regex over the region is not an option.
fn balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Locates `marker = {...}` in a page (the `window["marker"] = {...}`
/// spelling included) and parses the object. Marker occurrences that are not
/// followed by an assignment are skipped.
pub fn extract_json_variable(page: &str, marker: &'static str) -> Result<Value, ParseError> {
    let mut search_from = 0;

    while let Some(position) = page[search_from..].find(marker) {
        let after_marker = search_from + position + marker.len();
        search_from = after_marker;

        let rest = page[after_marker..]
            .trim_start_matches(|c: char| c == '"' || c == '\'' || c == ']' || c.is_whitespace());

        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };

        if let Some(object) = balanced_object(rest.trim_start()) {
            debug!("Found `{}` blob of {} bytes", marker, object.len());
            return Ok(serde_json::from_str(object)?);
        }
    }

    Err(ParseError::MarkerNotFound(marker))
}

/// Locates and parses both embedded blobs of a watch page.
pub fn extract_video_data(url: &str, page: &str) -> Result<VideoData, ParseError> {
    let player_response = extract_json_variable(page, PLAYER_RESPONSE_MARKER)?;
    let initial_data = extract_json_variable(page, INITIAL_DATA_MARKER)?;

    Ok(VideoData {
        url: url.to_string(),
        player_response,
        initial_data,
    })
}

/// Projects the playability status. LOGIN_REQUIRED covers both age-restricted
/// and private videos upstream; the two are told apart by which sibling key
/// the renderer carries.
pub fn get_status(data: &VideoData) -> VideoStatus {
    let playability = data.player_response.pointer("/playabilityStatus");

    let status = playability
        .and_then(|s| s.get("status"))
        .and_then(Value::as_str)
        .unwrap_or("ERROR");

    if status == "LOGIN_REQUIRED" {
        if let Some(playability) = playability {
            if playability.get("reason").is_some() {
                return VideoStatus::AgeRestricted;
            }
            if playability.get("messages").is_some() {
                return VideoStatus::Private;
            }
        }
    }

    VideoStatus::from_upstream(status)
}

lazy_static! {
    static ref LIKES_RE: Regex =
        Regex::new(r#""label"\s*:\s*"([\d,\.]+|No)\s+likes""#).unwrap();
    static ref DISLIKES_RE: Regex =
        Regex::new(r#""label"\s*:\s*"([\d,\.]+|No)\s+dislikes""#).unwrap();
}

fn count_from_label(content: &str, pattern: &Regex) -> Option<u64> {
    let captures = pattern.captures(content)?;
    let label = &captures[1];

    if label == "No" {
        Some(0)
    } else {
        label.replace([',', '.'], "").parse().ok()
    }
}

fn string_at(value: &Value, path: &str) -> Option<String> {
    value.pointer(path).and_then(Value::as_str).map(str::to_string)
}

fn bool_at(value: &Value, path: &str) -> Option<bool> {
    value.pointer(path).and_then(Value::as_bool)
}

/// The view and length counters come over the wire as decimal strings.
fn numeric_string_at(value: &Value, path: &str) -> Option<u64> {
    value
        .pointer(path)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

fn chat_available(data: &VideoData) -> bool {
    let renderer = data
        .initial_data
        .pointer("/contents/twoColumnWatchNextResults/conversationBar/liveChatRenderer");

    renderer.is_some()
        && !data
            .initial_data
            .to_string()
            .contains("Live chat replay is not available")
}

fn extract_chapters(initial_data: &Value) -> Option<Vec<Chapter>> {
    let chapters = initial_data
        .pointer(
            "/playerOverlays/playerOverlayRenderer/decoratedPlayerBarRenderer\
             /decoratedPlayerBarRenderer/playerBar/chapteredPlayerBarRenderer/chapters",
        )
        .and_then(Value::as_array)?;

    Some(
        chapters
            .iter()
            .filter_map(|chapter| {
                Some(Chapter {
                    title: string_at(chapter, "/chapterRenderer/title/simpleText")?,
                    start_time_millis: chapter
                        .pointer("/chapterRenderer/timeRangeStartMillis")?
                        .as_u64()?,
                })
            })
            .collect(),
    )
}

/// Takes a video's embedded data and returns the most relevant video info.
///
/// Pure projection of its input aside from the `timestamp` field, which
/// records the extraction time.
pub fn extract_info(data: &VideoData) -> VideoInfo {
    let mut info = VideoInfo::new(get_status(data));

    // Error and private pages carry no details renderer worth walking.
    if matches!(info.status, VideoStatus::Error | VideoStatus::Private) {
        info.id = video_id_from_url(&data.url).map(str::to_string);
        return info;
    }

    let player = &data.player_response;
    let microformat = player
        .pointer("/microformat/playerMicroformatRenderer")
        .or_else(|| player.pointer("/microformat/microformatDataRenderer"));

    info.id = string_at(player, "/videoDetails/videoId");
    info.author = string_at(player, "/videoDetails/author");
    info.channel_id = string_at(player, "/videoDetails/channelId");
    info.title = string_at(player, "/videoDetails/title");
    info.description = string_at(player, "/videoDetails/shortDescription");
    info.length_seconds = numeric_string_at(player, "/videoDetails/lengthSeconds");
    info.live_content = bool_at(player, "/videoDetails/isLiveContent");
    info.views = numeric_string_at(player, "/videoDetails/viewCount");
    info.average_rating = player
        .pointer("/videoDetails/averageRating")
        .and_then(Value::as_f64);
    info.keywords = player
        .pointer("/videoDetails/keywords")
        .and_then(Value::as_array)
        .map(|keywords| {
            keywords
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

    if let Some(microformat) = microformat {
        info.publish_date = string_at(microformat, "/publishDate");
        info.upload_date = string_at(microformat, "/uploadDate");
        info.family_safe = bool_at(microformat, "/isFamilySafe");
        info.unlisted = bool_at(microformat, "/isUnlisted");
        info.category = string_at(microformat, "/category");
        // only for live streams
        info.start_time = string_at(microformat, "/liveBroadcastDetails/startTimestamp");
        info.end_time = string_at(microformat, "/liveBroadcastDetails/endTimestamp");
    }

    info.chat_available = Some(chat_available(data));
    info.chapters = extract_chapters(&data.initial_data);

    // The like counters only surface inside localized accessibility labels
    // scattered through the watch-next renderers, so scan the serialized
    // subtree instead of chasing renderer paths that move every few months.
    if let Some(contents) = data
        .initial_data
        .pointer("/contents/twoColumnWatchNextResults/results/results/contents")
    {
        let contents = contents.to_string();
        info.likes = count_from_label(&contents, &LIKES_RE);
        info.dislikes = count_from_label(&contents, &DISLIKES_RE);
    }

    info
}

/// Walks a channel listing page's `ytInitialData` and collects the video ids
/// of the first grid page, in source order. Continuation entries are skipped;
/// following them is up to the caller.
pub fn extract_channel_videos(initial_data: &Value) -> Vec<String> {
    let mut videos = vec![];

    let tabs = initial_data
        .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
        .and_then(Value::as_array);

    let Some(tabs) = tabs else {
        return videos;
    };

    for tab in tabs {
        let items = tab
            .pointer("/tabRenderer/content/richGridRenderer/contents")
            .and_then(Value::as_array);

        let Some(items) = items else {
            continue;
        };

        for item in items {
            if item.get("continuationItemRenderer").is_some() {
                continue;
            }

            let id = item
                .pointer("/richItemRenderer/content/videoRenderer/videoId")
                .or_else(|| item.pointer("/richItemRenderer/content/reelItemRenderer/videoId"))
                .and_then(Value::as_str);

            if let Some(id) = id {
                videos.push(id.to_string());
            }
        }
    }

    videos
}
