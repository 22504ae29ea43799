//! The fixed roster of RSS feeds and category inference for their entries.

use np_core::Category;

/// One subscribed feed. `category` is the default when nothing in the entry
/// text says otherwise.
#[derive(Debug, Clone, Copy)]
pub struct FeedSource {
    pub name: &'static str,
    pub url: &'static str,
    pub category: Category,
}

pub const FEEDS: &[FeedSource] = &[
    FeedSource {
        name: "Yahoo!ニュース",
        url: "https://news.yahoo.co.jp/rss/topics/top-picks.xml",
        category: Category::General,
    },
    FeedSource {
        name: "NHK",
        url: "https://www3.nhk.or.jp/rss/news/cat0.xml",
        category: Category::General,
    },
    FeedSource {
        name: "読売新聞オンライン",
        url: "https://www.yomiuri.co.jp/rss/yol/latestnews",
        category: Category::Domestic,
    },
    FeedSource {
        name: "共同通信",
        url: "https://english.kyodonews.net/rss/all.xml",
        category: Category::Domestic,
    },
    FeedSource {
        name: "Reuters",
        url: "https://feeds.reuters.com/reuters/worldNews",
        category: Category::World,
    },
    FeedSource {
        name: "AP News",
        url: "https://apnews.com/index.rss",
        category: Category::World,
    },
    FeedSource {
        name: "BBC News",
        url: "https://feeds.bbci.co.uk/news/world/rss.xml",
        category: Category::World,
    },
];

const TECHNOLOGY: &[&str] = &[
    "AI", "人工知能", "半導体", "テクノロジー", "デジタル", "アプリ", "サイバー",
    "量子", "ロボット", "スマホ", "tech", "software", "chip", "quantum",
];
const POLITICS: &[&str] = &[
    "政治", "国会", "内閣", "首相", "大臣", "政党", "法案", "選挙", "条例",
    "裁判", "判決", "税制",
];
const SPORTS: &[&str] = &[
    "スポーツ", "野球", "サッカー", "五輪", "オリンピック", "テニス", "ゴルフ",
    "大相撲", "W杯",
];
const ENTERTAINMENT: &[&str] = &[
    "エンタメ", "芸能", "映画", "ドラマ", "音楽", "アイドル", "俳優", "女優",
];
const WORLD: &[&str] = &[
    "国際", "米国", "アメリカ", "中国", "欧州", "ロシア", "ウクライナ", "国連",
    "北朝鮮", "韓国",
];

/// Keyword-based category inference over title + summary; the feed default
/// wins when nothing matches. Specific beats broad, so technology and
/// politics are checked before world.
pub fn infer_category(title: &str, summary: &str, default: Category) -> Category {
    let text = format!("{} {}", title, summary);
    let hit = |kws: &[&str]| kws.iter().any(|kw| text.contains(kw));
    if hit(TECHNOLOGY) {
        Category::Technology
    } else if hit(POLITICS) {
        Category::Politics
    } else if hit(SPORTS) {
        Category::Sports
    } else if hit(ENTERTAINMENT) {
        Category::Entertainment
    } else if hit(WORLD) {
        Category::World
    } else {
        default
    }
}
