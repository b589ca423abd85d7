use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Maximum number of stories taken from a category index.
pub const MAX_STORIES: usize = 10;

/// Hacker News item identifier. Assigned by the server, never changes.
pub type ItemId = u64;

/// A story listing on Hacker News.
///
/// Each category maps to one index endpoint (`/{category}stories.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    New,
    Top,
    Best,
    Job,
}

impl Category {
    /// All categories in tab order.
    pub const ALL: [Category; 4] = [Category::New, Category::Top, Category::Best, Category::Job];

    /// Index endpoint name, without extension.
    pub fn endpoint(self) -> &'static str {
        match self {
            Category::New => "newstories",
            Category::Top => "topstories",
            Category::Best => "beststories",
            Category::Job => "jobstories",
        }
    }

    /// Human readable tab label.
    pub fn label(self) -> &'static str {
        match self {
            Category::New => "New",
            Category::Top => "Top",
            Category::Best => "Best",
            Category::Job => "Jobs",
        }
    }

    /// The category after this one, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::New => "new",
            Category::Top => "top",
            Category::Best => "best",
            Category::Job => "job",
        })
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Category::New),
            "top" => Ok(Category::Top),
            "best" => Ok(Category::Best),
            "job" | "jobs" => Ok(Category::Job),
            other => Err(format!(
                "unknown category '{}' (expected new, top, best or job)",
                other
            )),
        }
    }
}

/// A decoded story record.
///
/// Decoding is all-or-nothing: `id`, `title`, `score` and `time` are required,
/// a wrong type anywhere fails the whole record, unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryItem {
    pub id: ItemId,
    pub title: String,
    /// External link. Absent for Ask HN posts and some job posts.
    #[serde(default)]
    pub url: Option<String>,
    pub score: i64,
    /// Submission time, seconds since the Unix epoch.
    pub time: i64,
    #[serde(default)]
    pub by: Option<String>,
    /// Comment count.
    #[serde(default)]
    pub descendants: Option<u32>,
}

impl StoryItem {
    /// Link to the discussion page on news.ycombinator.com.
    pub fn discussion_url(&self) -> String {
        format!("https://news.ycombinator.com/item?id={}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>(), Ok(category));
        }
        assert_eq!("Jobs".parse::<Category>(), Ok(Category::Job));
        assert!("ask".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_next_wraps() {
        assert_eq!(Category::New.next(), Category::Top);
        assert_eq!(Category::Job.next(), Category::New);
    }

    #[test]
    fn test_category_endpoints() {
        assert_eq!(Category::New.endpoint(), "newstories");
        assert_eq!(Category::Job.endpoint(), "jobstories");
    }

    #[test]
    fn test_decode_full_story() {
        let json = r#"{"id":8863,"title":"My YC app","url":"http://www.getdropbox.com/u/2/screencast.html",
            "score":111,"time":1175714200,"by":"dhouston","descendants":71,"type":"story","kids":[8952]}"#;
        let item: StoryItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 8863);
        assert_eq!(item.title, "My YC app");
        assert_eq!(item.score, 111);
        assert_eq!(item.time, 1175714200);
        assert_eq!(item.by.as_deref(), Some("dhouston"));
        assert_eq!(item.descendants, Some(71));
    }

    #[test]
    fn test_decode_without_url() {
        let json = r#"{"id":1,"title":"Ask HN: anything","score":5,"time":1}"#;
        let item: StoryItem = serde_json::from_str(json).unwrap();
        assert!(item.url.is_none());
        assert_eq!(
            item.discussion_url(),
            "https://news.ycombinator.com/item?id=1"
        );
    }

    #[test]
    fn test_decode_missing_required_field_fails() {
        let json = r#"{"id":1,"url":"https://example.com","score":5,"time":1}"#;
        assert!(serde_json::from_str::<StoryItem>(json).is_err());
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let json = r#"{"id":1,"title":"T","score":"many","time":1}"#;
        assert!(serde_json::from_str::<StoryItem>(json).is_err());

        let json = r#"{"id":1,"title":"T","url":42,"score":1,"time":1}"#;
        assert!(serde_json::from_str::<StoryItem>(json).is_err());
    }
}
