//! Feed reflection: upstream video feeds re-emitted as podcast RSS.
//!
//! An upstream feed (Atom for YouTube, RSS 2.0 accepted as well) is fetched,
//! parsed into [`FeedItem`]s, and written back out as an RSS 2.0 channel whose
//! item links and enclosures point at this server's content route instead of
//! the upstream site.

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};

/// One entry of an upstream feed
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedItem {
    /// Item title
    pub title: String,
    /// Upstream link to the media page
    pub link: Option<String>,
    /// Item description
    pub description: Option<String>,
    /// Author name
    pub author_name: Option<String>,
    /// Author email
    pub author_email: Option<String>,
    /// Unique identifier (entry id for Atom, guid for RSS)
    pub guid: Option<String>,
    /// Publication date
    pub published: Option<DateTime<FixedOffset>>,
    /// Last update
    pub updated: Option<DateTime<FixedOffset>>,
}

/// An upstream feed reduced to what the reflected channel needs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedFeed {
    /// Feed title
    pub title: String,
    /// Feed home page
    pub link: String,
    /// Feed description
    pub description: String,
    /// Author name
    pub author_name: Option<String>,
    /// Author email
    pub author_email: Option<String>,
    /// Publication date
    pub published: Option<DateTime<FixedOffset>>,
    /// Last update
    pub updated: Option<DateTime<FixedOffset>>,
    /// Entries, in upstream order
    pub items: Vec<FeedItem>,
}

/// Where rewritten media links point
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTarget {
    /// Host (with optional port) clients reached this server on
    pub host: String,
    /// Path prefix of the content route for the source, e.g. `/content/youtube`
    pub content_prefix: String,
}

impl LinkTarget {
    /// Rewrite an upstream link so it points at this server's content route
    ///
    /// `https://www.youtube.com/watch?v=x` with host `pi:3322` and prefix
    /// `/content/youtube` becomes `http://pi:3322/content/youtube/watch?v=x`.
    pub fn rewrite(&self, link: &str) -> Result<String> {
        let url = url::Url::parse(link).map_err(|e| Error::InvalidUri {
            uri: link.to_string(),
            reason: e.to_string(),
        })?;

        let mut rewritten = format!(
            "http://{}{}/{}",
            self.host,
            self.content_prefix.trim_end_matches('/'),
            url.path().trim_start_matches('/')
        );
        if let Some(query) = url.query() {
            rewritten.push('?');
            rewritten.push_str(query);
        }
        Ok(rewritten)
    }
}

/// Fetches upstream feeds and reflects them as RSS
pub struct FeedReflector {
    /// HTTP client for fetching upstream feeds
    http_client: reqwest::Client,

    /// MIME type advertised on item enclosures
    content_mime_type: String,
}

impl FeedReflector {
    /// Create a new reflector
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Feed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            content_mime_type: config.content_mime_type.clone(),
        })
    }

    /// Fetch `upstream_url` and return it as RSS with links pointing at `target`
    ///
    /// # Errors
    /// Returns error if:
    /// - the HTTP request fails or times out
    /// - upstream answers with a non-success status
    /// - the body is neither Atom nor RSS
    pub async fn reflect(&self, upstream_url: &str, target: &LinkTarget) -> Result<String> {
        tracing::info!(url = %upstream_url, "fetching upstream feed");
        let content = self.fetch_upstream(upstream_url).await?;
        let feed = parse_feed(&content)?;
        tracing::debug!(items = feed.items.len(), "parsed upstream feed");
        render_rss(&feed, target, &self.content_mime_type)
    }

    async fn fetch_upstream(&self, url: &str) -> Result<String> {
        let response = self.http_client.get(url).send().await?;

        // Check HTTP status before trying to parse the response body
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Parse feed content, trying Atom first and RSS 2.0 second
pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
    match parse_as_atom(content) {
        Ok(feed) => Ok(feed),
        Err(atom_err) => {
            tracing::debug!(error = %atom_err, "not an Atom feed, trying RSS");
            parse_as_rss(content).map_err(|rss_err| {
                Error::Feed(format!(
                    "Failed to parse feed as Atom or RSS. Atom error: {}. RSS error: {}",
                    atom_err, rss_err
                ))
            })
        }
    }
}

fn parse_as_atom(content: &str) -> Result<ParsedFeed> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes())
        .map_err(|e| Error::Feed(format!("Atom parse error: {}", e)))?;

    let author = feed.authors().first();
    let items = feed
        .entries()
        .iter()
        .map(|entry| {
            let author = entry.authors().first();
            // YouTube keeps the video description in <media:group><media:description>
            let description = entry
                .summary()
                .map(|s| s.as_str().to_string())
                .or_else(|| {
                    entry
                        .content()
                        .and_then(|c| c.value().map(|v| v.to_string()))
                })
                .or_else(|| media_description(entry));

            FeedItem {
                title: entry.title().as_str().to_string(),
                link: alternate_link(entry.links()),
                description,
                author_name: author.map(|a| a.name().to_string()),
                author_email: author.and_then(|a| a.email().map(|e| e.to_string())),
                guid: Some(entry.id().to_string()),
                published: entry.published().copied(),
                updated: Some(*entry.updated()),
            }
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title().as_str().to_string(),
        link: alternate_link(feed.links()).unwrap_or_default(),
        description: feed
            .subtitle()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        author_name: author.map(|a| a.name().to_string()),
        author_email: author.and_then(|a| a.email().map(|e| e.to_string())),
        published: None,
        updated: Some(*feed.updated()),
        items,
    })
}

fn parse_as_rss(content: &str) -> Result<ParsedFeed> {
    let channel = content
        .parse::<rss::Channel>()
        .map_err(|e| Error::Feed(format!("RSS parse error: {}", e)))?;

    let items = channel
        .items()
        .iter()
        .map(|item| FeedItem {
            title: item.title().unwrap_or("").to_string(),
            link: item.link().map(|l| l.to_string()),
            description: item.description().map(|d| d.to_string()),
            author_name: item.author().map(|a| a.to_string()),
            author_email: None,
            guid: item.guid().map(|g| g.value().to_string()),
            published: item.pub_date().and_then(parse_rfc2822),
            updated: None,
        })
        .collect();

    Ok(ParsedFeed {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        description: channel.description().to_string(),
        author_name: channel.managing_editor().map(|m| m.to_string()),
        author_email: None,
        published: channel.pub_date().and_then(parse_rfc2822),
        updated: channel.last_build_date().and_then(parse_rfc2822),
        items,
    })
}

/// Write `feed` as an RSS 2.0 document with links rewritten to `target`
pub fn render_rss(feed: &ParsedFeed, target: &LinkTarget, mime_type: &str) -> Result<String> {
    let mut items = Vec::with_capacity(feed.items.len());
    for entry in &feed.items {
        let mut item = rss::Item::default();
        item.set_title(entry.title.clone());
        item.set_description(entry.description.clone());
        item.set_author(format_author(
            entry.author_name.as_deref(),
            entry.author_email.as_deref(),
        ));
        item.set_pub_date(entry.published.or(entry.updated).map(|d| d.to_rfc2822()));

        if let Some(link) = &entry.link {
            let reflected = target.rewrite(link)?;
            let mut enclosure = rss::Enclosure::default();
            enclosure.set_url(reflected.clone());
            enclosure.set_length("0");
            enclosure.set_mime_type(mime_type);
            item.set_enclosure(enclosure);
            item.set_link(reflected);
        }

        if let Some(id) = &entry.guid {
            let mut guid = rss::Guid::default();
            guid.set_value(id.clone());
            guid.set_permalink(false);
            item.set_guid(guid);
        }

        items.push(item);
    }

    let mut channel = rss::Channel::default();
    channel.set_title(feed.title.clone());
    channel.set_link(feed.link.clone());
    channel.set_description(feed.description.clone());
    channel.set_managing_editor(format_author(
        feed.author_name.as_deref(),
        feed.author_email.as_deref(),
    ));
    channel.set_pub_date(feed.published.map(|d| d.to_rfc2822()));
    channel.set_last_build_date(feed.updated.map(|d| d.to_rfc2822()));
    channel.set_items(items);

    let buffer = channel
        .write_to(Vec::new())
        .map_err(|e| Error::Feed(format!("RSS write error: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| Error::Feed(format!("RSS write error: {}", e)))
}

/// RSS wants `email (name)` for authors
fn format_author(name: Option<&str>, email: Option<&str>) -> Option<String> {
    let name = name.filter(|n| !n.is_empty());
    let email = email.filter(|e| !e.is_empty());
    match (name, email) {
        (Some(name), Some(email)) => Some(format!("{} ({})", email, name)),
        (None, Some(email)) => Some(email.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}

fn alternate_link(links: &[atom_syndication::Link]) -> Option<String> {
    links
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| links.first())
        .map(|link| link.href().to_string())
}

fn media_description(entry: &atom_syndication::Entry) -> Option<String> {
    entry
        .extensions()
        .get("media")
        .and_then(|media| media.get("group"))
        .and_then(|groups| groups.first())
        .and_then(|group| {
            let children = group.children();
            children
                .get("media:description")
                .or_else(|| children.get("description"))
        })
        .and_then(|descriptions| descriptions.first())
        .and_then(|description| description.value())
        .map(|value| value.to_string())
}

fn parse_rfc2822(date: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(date).ok()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
