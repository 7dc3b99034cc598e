use crate::error::{Error, FetchError};
use crate::youtube::extract::{
    extract_channel_videos, extract_info, extract_json_variable, extract_video_data, VideoData,
    VideoInfo, INITIAL_DATA_MARKER,
};
use clap::ValueEnum;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use reqwest::Client;
use std::fmt::{self, Display, Formatter};

lazy_static! {
    static ref BARE_ID: Regex = Regex::new(r"^[\w-]+$").unwrap();
    static ref HANDLE: Regex = Regex::new(r"^@[\w.-]+$").unwrap();
    static ref WATCH_URL: Regex =
        Regex::new(r"https?://(?:www\.youtube\.com/watch\?v=|youtu\.be/)([\w-]+)").unwrap();
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Maxres,
    Hq,
}

impl ThumbnailFormat {
    fn file_stem(self) -> &'static str {
        match self {
            ThumbnailFormat::Maxres => "maxresdefault",
            ThumbnailFormat::Hq => "hqdefault",
        }
    }
}

impl Display for ThumbnailFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ThumbnailFormat::Maxres => write!(f, "maxres"),
            ThumbnailFormat::Hq => write!(f, "hq"),
        }
    }
}

/// Pulls the video id out of a watch or youtu.be url.
pub(crate) fn video_id_from_url(url: &str) -> Option<&str> {
    WATCH_URL
        .captures(url)
        .map(|captures| captures.get(1).unwrap().as_str())
}

fn watch_url(input: &str) -> String {
    if BARE_ID.is_match(input) {
        format!("https://www.youtube.com/watch?v={}", input)
    } else {
        input.to_string()
    }
}

fn channel_videos_url(input: &str) -> String {
    if HANDLE.is_match(input) {
        format!("https://www.youtube.com/{}/videos", input)
    } else if BARE_ID.is_match(input) {
        format!("https://www.youtube.com/channel/{}/videos", input)
    } else {
        format!("{}/videos", input.trim_end_matches('/'))
    }
}

fn thumbnail_url(input: &str, format: ThumbnailFormat) -> Result<String, FetchError> {
    let id = if BARE_ID.is_match(input) {
        input
    } else {
        video_id_from_url(input).ok_or_else(|| FetchError::InvalidInput(input.to_string()))?
    };

    Ok(format!("https://i.ytimg.com/vi/{}/{}.jpg", id, format.file_stem()))
}

async fn fetch(url: &str, client: Option<&Client>) -> Result<reqwest::Response, FetchError> {
    // An ephemeral client lives exactly as long as this call; callers doing
    // many fetches pass their own pooled client instead.
    let ephemeral;
    let client = match client {
        Some(client) => client,
        None => {
            ephemeral = Client::new();
            &ephemeral
        }
    };

    debug!("GET {}", url);
    let response = client
        .get(url)
        .header("accept-language", "en-US,en;q=0.9")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        warn!("Got status code {} for {}", status, url);
        return Err(FetchError::Status {
            status,
            url: url.to_string(),
        });
    }

    Ok(response)
}

/// Fetches the raw watch page for a video url or id. Callers wanting their
/// own extraction run this and feed the body to the extractors themselves.
pub async fn get_page(input: &str, client: Option<&Client>) -> Result<String, Error> {
    let url = watch_url(input);
    let page = fetch(&url, client).await?.text().await.map_err(FetchError::Http)?;
    Ok(page)
}

/// Takes a video url or id and returns the video's complete embedded data.
pub async fn get_data(input: &str, client: Option<&Client>) -> Result<VideoData, Error> {
    let url = watch_url(input);
    let page = fetch(&url, client).await?.text().await.map_err(FetchError::Http)?;
    Ok(extract_video_data(&url, &page)?)
}

/// Takes a video url or id and returns the extracted video info.
pub async fn get_info(input: &str, client: Option<&Client>) -> Result<VideoInfo, Error> {
    let data = get_data(input, client).await?;
    Ok(extract_info(&data))
}

/// Takes a channel url, handle or id and returns the video ids of the main
/// video catalog's first page, in listing order.
pub async fn get_channel_videos(
    input: &str,
    client: Option<&Client>,
) -> Result<Vec<String>, Error> {
    let url = channel_videos_url(input);
    let page = fetch(&url, client).await?.text().await.map_err(FetchError::Http)?;

    let initial_data = extract_json_variable(&page, INITIAL_DATA_MARKER)?;
    let videos = extract_channel_videos(&initial_data);

    debug!("Found {} videos for {}", videos.len(), url);
    Ok(videos)
}

/// Takes a video url or id and returns the thumbnail as raw byte data. No
/// decoding or validation is performed on the image.
pub async fn get_thumbnail(
    input: &str,
    format: ThumbnailFormat,
    client: Option<&Client>,
) -> Result<Vec<u8>, Error> {
    let url = thumbnail_url(input, format)?;
    let bytes = fetch(&url, client)
        .await?
        .bytes()
        .await
        .map_err(FetchError::Http)?;

    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Binds a loopback listener that answers exactly one request with the
    /// given canned response, then closes the connection.
    async fn one_shot_server(response: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response.as_bytes()).await;
        });

        addr
    }

    #[tokio::test]
    async fn non_2xx_response_is_a_status_error() {
        let addr = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let url = format!("http://{}/vi/abc123/maxresdefault.jpg", addr);
        let result = fetch(&url, None).await;

        assert!(matches!(
            result,
            Err(FetchError::Status { status, .. }) if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn channel_listing_fetch_failure_surfaces_as_fetch_error() {
        let addr = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let result = get_channel_videos(&format!("http://{}/somechannel", addr), None).await;
        assert!(matches!(
            result,
            Err(Error::Fetch(FetchError::Status { .. }))
        ));
    }

    #[tokio::test]
    async fn get_page_returns_the_raw_body() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 23\r\n\
             connection: close\r\n\r\n<html>watch page</html>",
        )
        .await;

        let page = get_page(&format!("http://{}/watch?v=abc123", addr), None)
            .await
            .unwrap();
        assert_eq!(page, "<html>watch page</html>");
    }

    #[test]
    fn bare_id_becomes_watch_url() {
        assert_eq!(
            watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn full_url_passes_through() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(watch_url(url), url);
    }

    #[test]
    fn video_id_from_watch_and_short_urls() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id_from_url("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video_id_from_url("https://example.com/watch?v=nope"), None);
    }

    #[test]
    fn channel_url_forms() {
        assert_eq!(
            channel_videos_url("@somechannel"),
            "https://www.youtube.com/@somechannel/videos"
        );
        assert_eq!(
            channel_videos_url("UC0123456789abcdefghijkl"),
            "https://www.youtube.com/channel/UC0123456789abcdefghijkl/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/@somechannel/"),
            "https://www.youtube.com/@somechannel/videos"
        );
    }

    #[test]
    fn thumbnail_url_is_deterministic() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailFormat::Maxres).unwrap(),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
        assert_eq!(
            thumbnail_url("https://youtu.be/dQw4w9WgXcQ", ThumbnailFormat::Hq).unwrap(),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }

    #[test]
    fn thumbnail_rejects_urls_without_a_video_id() {
        let result = thumbnail_url("https://example.com/clip", ThumbnailFormat::Maxres);
        assert!(matches!(result, Err(FetchError::InvalidInput(_))));
    }
}
