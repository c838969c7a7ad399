use serde::Serialize;

/// A built-in, named keyword set the user can enable or disable as a unit.
/// The table is fixed at compile time; only the enabled/disabled choice
/// lives in [`super::PolicyState`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const PREDEFINED: &[WebsiteCategory] = &[
    WebsiteCategory {
        id: "social_media",
        name: "Social Media",
        keywords: &[
            "facebook.com",
            "twitter.com",
            "x.com",
            "instagram.com",
            "tiktok.com",
            "snapchat.com",
            "reddit.com",
            "linkedin.com",
        ],
    },
    WebsiteCategory {
        id: "shopping",
        name: "Shopping",
        keywords: &[
            "amazon.com",
            "ebay.com",
            "etsy.com",
            "walmart.com",
            "target.com",
            "aliexpress.com",
            "shopify.com",
            "wish.com",
        ],
    },
    WebsiteCategory {
        id: "news",
        name: "News",
        keywords: &[
            "cnn.com",
            "bbc.com",
            "foxnews.com",
            "nytimes.com",
            "reuters.com",
            "theguardian.com",
            "huffpost.com",
            "news.google.com",
        ],
    },
    WebsiteCategory {
        id: "entertainment",
        name: "Entertainment",
        keywords: &[
            "youtube.com",
            "netflix.com",
            "hulu.com",
            "twitch.tv",
            "disneyplus.com",
            "spotify.com",
            "soundcloud.com",
            "dailymotion.com",
        ],
    },
    WebsiteCategory {
        id: "gaming",
        name: "Gaming",
        keywords: &[
            "steampowered.com",
            "epicgames.com",
            "roblox.com",
            "miniclip.com",
            "itch.io",
            "kongregate.com",
            "poki.com",
            "coolmathgames.com",
        ],
    },
];

pub fn category(id: &str) -> Option<&'static WebsiteCategory> {
    PREDEFINED.iter().find(|c| c.id == id)
}

/// Keywords contributed by a category id; unknown ids contribute nothing.
pub fn keywords_for(id: &str) -> &'static [&'static str] {
    category(id).map(|c| c.keywords).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_ids_resolve() {
        for c in PREDEFINED {
            assert!(category(c.id).is_some());
            assert_eq!(c.keywords.len(), 8);
        }
    }

    #[test]
    fn unknown_category_has_no_keywords() {
        assert!(category("doomscrolling").is_none());
        assert!(keywords_for("doomscrolling").is_empty());
    }
}
