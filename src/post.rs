use super::*;
use crate::ids::{TagId, UserId};
use anyhow::Context;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use std::path::Path;

/// Most posts the data-access service returns for one month.
pub const MONTH_POST_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// A shared music link. Read-only for the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_art_url: String,
    #[serde(default)]
    pub description: String,
    pub spotify_link: Option<String>,
    pub apple_music_link: Option<String>,
    pub youtube_link: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub profiles: Option<Profile>,
    #[serde(default)]
    pub likes_count: Option<u32>,
    #[serde(default)]
    pub is_liked: Option<bool>,
}
impl Post {
    /// Outbound links that are set, with the platform name.
    pub fn links(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Spotify", self.spotify_link.as_deref()),
            ("Apple Music", self.apple_music_link.as_deref()),
            ("YouTube", self.youtube_link.as_deref()),
        ]
        .into_iter()
        .filter_map(|(platform, link)| link.map(|link| (platform, link)))
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::of(self.created_at)
    }
}

/// Parse a json array of posts.
pub fn load_posts(path: impl AsRef<Path>) -> anyhow::Result<Vec<Post>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading posts {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing posts {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

/// A calendar month (UTC). Posts are grouped by the month they were created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// `[1..=12]`
    pub month: u32,
}
impl MonthKey {
    pub fn of(time: DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
        }
    }

    /// `YYYY-MM`
    pub fn label(self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Like [`MonthKey::next`], but never past the month of `now`.
    pub fn next_within(self, now: DateTime<Utc>) -> Option<Self> {
        let next = self.next();
        (next <= Self::of(now)).then_some(next)
    }

    pub fn is_current(self, now: DateTime<Utc>) -> bool {
        self == Self::of(now)
    }

    /// First instant and last millisecond of the month, both inclusive.
    pub fn range(self) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = self.next();
        let start = first_instant(self);
        let end = first_instant(next) - ChronoDuration::milliseconds(1);
        (start, end)
    }

    pub fn contains(self, time: DateTime<Utc>) -> bool {
        let (start, end) = self.range();
        start <= time && time <= end
    }
}

fn first_instant(month: MonthKey) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(month.year, month.month, 1).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Posts created in `month`, newest first, at most `limit`.
pub fn select_month<'a>(
    posts: impl IntoIterator<Item = &'a Arc<Post>>,
    month: MonthKey,
    limit: usize,
) -> Vec<Arc<Post>> {
    let mut selected: Vec<Arc<Post>> = posts
        .into_iter()
        .filter(|post| month.contains(post.created_at))
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected.truncate(limit);
    selected
}

#[cfg(test)]
pub(crate) fn test_post(id: &str, created_at: DateTime<Utc>) -> Post {
    Post {
        id: PostId::new(id),
        user_id: UserId("user".to_owned()),
        title: format!("title {}", id),
        artist: "artist".to_owned(),
        album_art_url: String::new(),
        description: String::new(),
        spotify_link: Some(format!("https://open.spotify.com/track/{}", id)),
        apple_music_link: None,
        youtube_link: None,
        created_at,
        profiles: None,
        likes_count: None,
        is_liked: None,
    }
}
