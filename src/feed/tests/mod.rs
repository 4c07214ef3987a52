use super::*;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const YOUTUBE_CHANNEL_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
  <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UC123"/>
  <id>yt:channel:UC123</id>
  <yt:channelId>UC123</yt:channelId>
  <title>Test Channel</title>
  <link rel="alternate" href="https://www.youtube.com/channel/UC123"/>
  <author>
    <name>Test Channel</name>
    <uri>https://www.youtube.com/channel/UC123</uri>
  </author>
  <published>2019-03-01T10:00:00+00:00</published>
  <updated>2024-01-02T12:00:00+00:00</updated>
  <entry>
    <id>yt:video:abc</id>
    <yt:videoId>abc</yt:videoId>
    <title>Episode Two</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=abc"/>
    <author>
      <name>Test Channel</name>
      <uri>https://www.youtube.com/channel/UC123</uri>
    </author>
    <published>2024-01-02T10:00:00+00:00</published>
    <updated>2024-01-02T11:00:00+00:00</updated>
    <media:group>
      <media:title>Episode Two</media:title>
      <media:content url="https://www.youtube.com/v/abc?version=3" type="application/x-shockwave-flash" width="640" height="390"/>
      <media:description>The second episode</media:description>
    </media:group>
  </entry>
  <entry>
    <id>yt:video:xyz</id>
    <yt:videoId>xyz</yt:videoId>
    <title>Episode One</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=xyz"/>
    <published>2024-01-01T10:00:00+00:00</published>
    <updated>2024-01-01T11:00:00+00:00</updated>
    <summary>Summary wins over media description</summary>
  </entry>
</feed>"#;

const PLAIN_RSS_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0">
  <channel>
    <title>Plain Feed</title>
    <link>https://www.youtube.com/user/plain</link>
    <description>An RSS feed</description>
    <item>
      <title>Only Item</title>
      <link>https://www.youtube.com/watch?v=rss1</link>
      <guid>rss-guid-1</guid>
      <pubDate>Thu, 18 Jan 2024 12:00:00 GMT</pubDate>
      <description>From RSS</description>
    </item>
  </channel>
</rss>"#;

fn target() -> LinkTarget {
    LinkTarget {
        host: "pi:3322".to_string(),
        content_prefix: "/content/youtube".to_string(),
    }
}

fn test_feed_config() -> FeedConfig {
    FeedConfig {
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[test]
fn test_rewrite_keeps_path_and_query() {
    let rewritten = target()
        .rewrite("https://www.youtube.com/watch?v=abc&t=10")
        .unwrap();
    assert_eq!(rewritten, "http://pi:3322/content/youtube/watch?v=abc&t=10");
}

#[test]
fn test_rewrite_without_query() {
    let rewritten = target()
        .rewrite("https://www.youtube.com/channel/UC123")
        .unwrap();
    assert_eq!(rewritten, "http://pi:3322/content/youtube/channel/UC123");
}

#[test]
fn test_rewrite_tolerates_trailing_slash_in_prefix() {
    let target = LinkTarget {
        host: "localhost".to_string(),
        content_prefix: "/content/youtube/".to_string(),
    };
    assert_eq!(
        target.rewrite("https://www.youtube.com/watch?v=a").unwrap(),
        "http://localhost/content/youtube/watch?v=a"
    );
}

#[test]
fn test_rewrite_rejects_relative_link() {
    let result = target().rewrite("/watch?v=abc");
    assert!(matches!(result, Err(Error::InvalidUri { .. })));
}

#[test]
fn test_parse_youtube_atom_feed() {
    let feed = parse_feed(YOUTUBE_CHANNEL_FEED).expect("Failed to parse Atom");

    assert_eq!(feed.title, "Test Channel");
    assert_eq!(feed.link, "https://www.youtube.com/channel/UC123");
    assert_eq!(feed.author_name.as_deref(), Some("Test Channel"));
    assert!(feed.updated.is_some());
    assert_eq!(feed.items.len(), 2, "Should parse 2 entries");

    let first = &feed.items[0];
    assert_eq!(first.title, "Episode Two");
    assert_eq!(
        first.link.as_deref(),
        Some("https://www.youtube.com/watch?v=abc")
    );
    assert_eq!(first.guid.as_deref(), Some("yt:video:abc"));
    assert_eq!(first.description.as_deref(), Some("The second episode"));
    assert!(first.published.is_some());

    let second = &feed.items[1];
    assert_eq!(
        second.description.as_deref(),
        Some("Summary wins over media description")
    );
    assert_eq!(second.author_name, None);
}

#[test]
fn test_parse_falls_back_to_rss() {
    let feed = parse_feed(PLAIN_RSS_FEED).expect("Failed to parse RSS");

    assert_eq!(feed.title, "Plain Feed");
    assert_eq!(feed.description, "An RSS feed");
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].guid.as_deref(), Some("rss-guid-1"));
    assert_eq!(feed.items[0].description.as_deref(), Some("From RSS"));
    assert!(feed.items[0].published.is_some());
}

#[test]
fn test_parse_invalid_feed() {
    let result = parse_feed("This is not XML at all!");
    match result {
        Err(Error::Feed(message)) => {
            assert!(message.contains("Atom error"));
            assert!(message.contains("RSS error"));
        }
        other => panic!("expected feed error, got {other:?}"),
    }
}

#[test]
fn test_render_rewrites_links_and_adds_enclosures() {
    let feed = parse_feed(YOUTUBE_CHANNEL_FEED).unwrap();
    let xml = render_rss(&feed, &target(), "audio/mpeg").unwrap();

    let channel = xml.parse::<rss::Channel>().expect("rendered RSS must parse");
    assert_eq!(channel.title(), "Test Channel");
    assert_eq!(channel.link(), "https://www.youtube.com/channel/UC123");
    assert!(channel.last_build_date().is_some());
    assert_eq!(channel.items().len(), 2);

    let item = &channel.items()[0];
    assert_eq!(item.title(), Some("Episode Two"));
    assert_eq!(
        item.link(),
        Some("http://pi:3322/content/youtube/watch?v=abc")
    );
    assert_eq!(item.description(), Some("The second episode"));
    assert_eq!(item.author(), Some("Test Channel"));

    let enclosure = item.enclosure().expect("item should carry an enclosure");
    assert_eq!(enclosure.url(), "http://pi:3322/content/youtube/watch?v=abc");
    assert_eq!(enclosure.mime_type(), "audio/mpeg");

    let guid = item.guid().expect("item should carry a guid");
    assert_eq!(guid.value(), "yt:video:abc");
    assert!(!guid.is_permalink());

    let pub_date = item.pub_date().expect("item should carry a pubDate");
    assert!(DateTime::parse_from_rfc2822(pub_date).is_ok());
}

#[test]
fn test_render_item_without_link_has_no_enclosure() {
    let feed = ParsedFeed {
        title: "t".to_string(),
        items: vec![FeedItem {
            title: "no link".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };

    let xml = render_rss(&feed, &target(), "audio/mpeg").unwrap();
    let channel = xml.parse::<rss::Channel>().unwrap();
    assert!(channel.items()[0].enclosure().is_none());
    assert!(channel.items()[0].link().is_none());
}

#[test]
fn test_format_author() {
    assert_eq!(
        format_author(Some("Name"), Some("me@example.com")).as_deref(),
        Some("me@example.com (Name)")
    );
    assert_eq!(format_author(Some("Name"), None).as_deref(), Some("Name"));
    assert_eq!(
        format_author(None, Some("me@example.com")).as_deref(),
        Some("me@example.com")
    );
    assert_eq!(format_author(Some(""), None), None);
}

#[tokio::test]
async fn test_reflect_from_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("channel_id", "UC123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/atom+xml")
                .set_body_string(YOUTUBE_CHANNEL_FEED),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let reflector = FeedReflector::new(&test_feed_config()).unwrap();
    let url = format!("{}/feeds/videos.xml?channel_id=UC123", mock_server.uri());
    let xml = reflector.reflect(&url, &target()).await.unwrap();

    let channel = xml.parse::<rss::Channel>().unwrap();
    assert_eq!(channel.items().len(), 2);
    assert_eq!(
        channel.items()[1].link(),
        Some("http://pi:3322/content/youtube/watch?v=xyz")
    );
}

#[tokio::test]
async fn test_reflect_upstream_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let reflector = FeedReflector::new(&test_feed_config()).unwrap();
    let url = format!("{}/feeds/videos.xml", mock_server.uri());

    match reflector.reflect(&url, &target()).await {
        Err(Error::Upstream { status, url: failed }) => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reflect_unparseable_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&mock_server)
        .await;

    let reflector = FeedReflector::new(&test_feed_config()).unwrap();
    let result = reflector.reflect(&mock_server.uri(), &target()).await;
    assert!(matches!(result, Err(Error::Feed(_))));
}

#[tokio::test]
async fn test_reflect_sends_configured_user_agent() {
    use wiremock::matchers::header;

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "reflector-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAIN_RSS_FEED))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = FeedConfig {
        user_agent: "reflector-test/1.0".to_string(),
        ..test_feed_config()
    };
    let reflector = FeedReflector::new(&config).unwrap();
    reflector
        .reflect(&mock_server.uri(), &target())
        .await
        .unwrap();
}
