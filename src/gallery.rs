//! Image catalog, filter bar and paged gallery grid.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Category {
    Nature,
    Architecture,
    People,
    Technology,
    Abstract,
    Animals,
    Food,
    Travel,
    Art,
    Sports,
}

impl Category {
    /// Every category an upload may use
    pub const ALL: [Category; 10] = [
        Category::Nature,
        Category::Architecture,
        Category::People,
        Category::Technology,
        Category::Abstract,
        Category::Animals,
        Category::Food,
        Category::Travel,
        Category::Art,
        Category::Sports,
    ];

    /// Categories offered by the filter bar
    pub const FILTERABLE: [Category; 8] = [
        Category::Nature,
        Category::Architecture,
        Category::People,
        Category::Technology,
        Category::Abstract,
        Category::Animals,
        Category::Food,
        Category::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Nature => "Nature",
            Category::Architecture => "Architecture",
            Category::People => "People",
            Category::Technology => "Technology",
            Category::Abstract => "Abstract",
            Category::Animals => "Animals",
            Category::Food => "Food",
            Category::Travel => "Travel",
            Category::Art => "Art",
            Category::Sports => "Sports",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
    Original,
}

impl Quality {
    pub const ALL: [Quality; 4] = [
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Original => "original",
        }
    }

    /// Capitalized label used by the filter bar
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Low => "Low",
            Quality::Medium => "Medium",
            Quality::High => "High",
            Quality::Original => "Original",
        }
    }

    pub fn resolution(&self) -> &'static str {
        match self {
            Quality::Low => "300x400px",
            Quality::Medium => "600x800px",
            Quality::High => "1200x1600px",
            Quality::Original => "2400x3200px",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Per-quality download URLs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Qualities {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub original: String,
}

impl Qualities {
    /// Same URL at every quality
    pub fn uniform(url: &str) -> Self {
        Self {
            low: url.to_string(),
            medium: url.to_string(),
            high: url.to_string(),
            original: url.to_string(),
        }
    }

    pub fn get(&self, quality: Quality) -> &str {
        match quality {
            Quality::Low => &self.low,
            Quality::Medium => &self.medium,
            Quality::High => &self.high,
            Quality::Original => &self.original,
        }
    }

    pub fn has(&self, quality: Quality) -> bool {
        !self.get(quality).is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Published,
    Draft,
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Published => "published",
            ImageStatus::Draft => "draft",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ImageStatus::Published => ImageStatus::Draft,
            ImageStatus::Draft => ImageStatus::Published,
        }
    }
}

/// A gallery image
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Image {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub image_url: String,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub downloads: u64,
    pub likes: u64,
    pub qualities: Qualities,
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Image {
    /// Views are not tracked; they are estimated from downloads
    pub fn views(&self) -> u64 {
        self.downloads * 3 / 2
    }

    fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.category.as_str().to_lowercase().contains(&term)
    }
}

/// `Jan 15, 2024`
pub fn short_date(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}

/// `Monday, January 15, 2024`
pub fn long_date(ts: &DateTime<Utc>) -> String {
    ts.format("%A, %B %-d, %Y").to_string()
}

/// Compact count for card footers
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

struct DemoImage {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
    downloads: u64,
    likes: u64,
}

const DEMO_IMAGES: [DemoImage; 10] = [
    DemoImage {
        slug: "nature-1",
        title: "Mountain Lake Reflection",
        description: "A serene mountain lake with perfect reflections of snow-capped peaks during golden hour",
        category: Category::Nature,
        downloads: 1247,
        likes: 892,
    },
    DemoImage {
        slug: "nature-2",
        title: "Forest Path Adventure",
        description: "A mystical forest path leading through ancient trees with dappled sunlight",
        category: Category::Nature,
        downloads: 856,
        likes: 634,
    },
    DemoImage {
        slug: "architecture-1",
        title: "Modern Skyscraper",
        description: "Contemporary glass architecture reaching towards the sky with geometric patterns",
        category: Category::Architecture,
        downloads: 723,
        likes: 445,
    },
    DemoImage {
        slug: "architecture-2",
        title: "Urban Bridge Design",
        description: "Stunning architectural bridge design with modern engineering and artistic elements",
        category: Category::Architecture,
        downloads: 612,
        likes: 378,
    },
    DemoImage {
        slug: "people-1",
        title: "Professional Portrait",
        description: "Elegant professional headshot with perfect lighting and composition",
        category: Category::People,
        downloads: 934,
        likes: 567,
    },
    DemoImage {
        slug: "people-2",
        title: "Creative Portrait Study",
        description: "Artistic portrait photography with dramatic lighting and creative composition",
        category: Category::People,
        downloads: 789,
        likes: 423,
    },
    DemoImage {
        slug: "technology-1",
        title: "Laptop Workspace",
        description: "Modern workspace setup with laptop and technology accessories in clean environment",
        category: Category::Technology,
        downloads: 1156,
        likes: 678,
    },
    DemoImage {
        slug: "technology-2",
        title: "AI Robot Concept",
        description: "Futuristic AI robot design showcasing advanced technology and innovation",
        category: Category::Technology,
        downloads: 845,
        likes: 512,
    },
    DemoImage {
        slug: "abstract-1",
        title: "Abstract Color Flow",
        description: "Vibrant abstract composition with flowing colors and dynamic movement",
        category: Category::Abstract,
        downloads: 667,
        likes: 389,
    },
    DemoImage {
        slug: "abstract-2",
        title: "Geometric Patterns",
        description: "Mesmerizing geometric patterns with perfect symmetry and color harmony",
        category: Category::Abstract,
        downloads: 534,
        likes: 298,
    },
];

fn placeholder(height: u32, width: u32, text: &str) -> String {
    format!("/placeholder.svg?height={}&width={}&text={}", height, width, text)
}

/// In-memory image catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: Vec<Image>,
}

impl Catalog {
    /// Demo catalog: ten showcase images plus ten generated placeholders.
    /// Upload times are relative to `now`; generated stats are deterministic.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut images = Vec::with_capacity(20);

        for (i, demo) in DEMO_IMAGES.iter().enumerate() {
            let url = format!("/demo/{}.jpg", demo.slug);
            images.push(Image {
                id: format!("img-{}", i + 1),
                title: demo.title.to_string(),
                description: demo.description.to_string(),
                category: demo.category,
                image_url: url.clone(),
                uploaded_by: "Admin".to_string(),
                uploaded_at: now - Duration::days(i as i64 + 1),
                downloads: demo.downloads,
                likes: demo.likes,
                qualities: Qualities::uniform(&url),
                status: ImageStatus::Published,
                tags: Vec::new(),
            });
        }

        for i in 0..10u64 {
            let n = i + 11;
            images.push(Image {
                id: format!("img-{}", n),
                title: format!("Beautiful Image {}", n),
                description: format!(
                    "A stunning photograph showcasing amazing details and composition {}",
                    n
                ),
                category: Category::ALL[(i % 5) as usize],
                image_url: placeholder(400, 600, &format!("Image+{}", n)),
                uploaded_by: "Admin".to_string(),
                uploaded_at: now - Duration::hours((n * 37 % 2777) as i64),
                downloads: n * 47 % 1000,
                likes: n * 29 % 500,
                qualities: Qualities {
                    low: placeholder(200, 300, &format!("Low+{}", n)),
                    medium: placeholder(400, 600, &format!("Medium+{}", n)),
                    high: placeholder(800, 1200, &format!("High+{}", n)),
                    original: placeholder(1600, 2400, &format!("Original+{}", n)),
                },
                status: ImageStatus::Published,
                tags: Vec::new(),
            });
        }

        Self { images }
    }

    pub fn all(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn get(&self, id: &str) -> Option<&Image> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Image> {
        self.images.iter_mut().find(|img| img.id == id)
    }

    /// Detail lookup; unknown ids resolve to a placeholder sample
    pub fn detail(&self, id: &str) -> Image {
        if let Some(image) = self.get(id) {
            return image.clone();
        }
        Image {
            id: id.to_string(),
            title: "Sample Image".to_string(),
            description: "A beautiful photograph showcasing amazing details and composition"
                .to_string(),
            category: Category::Nature,
            image_url: "/placeholder.svg?height=600&width=800".to_string(),
            uploaded_by: "Admin".to_string(),
            uploaded_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            downloads: 42,
            likes: 128,
            qualities: Qualities {
                low: "/placeholder.svg?height=300&width=400".to_string(),
                medium: "/placeholder.svg?height=600&width=800".to_string(),
                high: "/placeholder.svg?height=1200&width=1600".to_string(),
                original: "/placeholder.svg?height=2400&width=3200".to_string(),
            },
            status: ImageStatus::Published,
            tags: Vec::new(),
        }
    }

    /// Published images matching the filter, in catalog order
    pub fn visible<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Image> + 'a {
        self.images
            .iter()
            .filter(|img| img.status == ImageStatus::Published)
            .filter(move |img| filter.matches(img))
    }

    /// Newest uploads go first
    pub fn insert_front(&mut self, image: Image) -> Result<()> {
        if self.get(&image.id).is_some() {
            return Err(anyhow!("Image already exists: {}", image.id));
        }
        self.images.insert(0, image);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Image> {
        let pos = self.images.iter().position(|img| img.id == id)?;
        Some(self.images.remove(pos))
    }
}

/// Filter bar state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub search: String,
    pub category: Option<Category>,
    pub quality: Option<Quality>,
}

impl Filter {
    pub fn matches(&self, image: &Image) -> bool {
        let search = self.search.trim();
        if !search.is_empty() && !image.matches_search(search) {
            return false;
        }
        if let Some(category) = self.category {
            if image.category != category {
                return false;
            }
        }
        if let Some(quality) = self.quality {
            if !image.qualities.has(quality) {
                return false;
            }
        }
        true
    }

    /// Chips shown under the filter bar, category before quality
    pub fn active_filters(&self) -> Vec<String> {
        let mut chips = Vec::new();
        if let Some(category) = self.category {
            chips.push(category.as_str().to_string());
        }
        if let Some(quality) = self.quality {
            chips.push(quality.label().to_string());
        }
        chips
    }

    /// Drop a chip and reset the selector it came from
    pub fn remove_filter(&mut self, chip: &str) -> bool {
        if self.category.is_some_and(|c| c.as_str().eq_ignore_ascii_case(chip)) {
            self.category = None;
            return true;
        }
        if self.quality.is_some_and(|q| q.label().eq_ignore_ascii_case(chip)) {
            self.quality = None;
            return true;
        }
        false
    }

    /// Reset every selector and the search term
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// "Load more" pagination over the filtered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    shown: usize,
    page_size: usize,
    initial: usize,
    has_more: bool,
}

impl Pager {
    pub fn new(initial: usize, page_size: usize) -> Self {
        Self {
            shown: initial,
            page_size,
            initial,
            has_more: true,
        }
    }

    pub fn reset(&mut self) {
        self.shown = self.initial;
        self.has_more = true;
    }

    /// Number of cards currently on screen given `total` matches
    pub fn shown(&self, total: usize) -> usize {
        self.shown.min(total)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Append the next page. Returns how many cards were added; a load that
    /// adds nothing marks the end of the gallery.
    pub fn load_more(&mut self, total: usize) -> usize {
        if !self.has_more {
            return 0;
        }
        let current = self.shown(total);
        let added = total.saturating_sub(current).min(self.page_size);
        if added == 0 {
            self.has_more = false;
        } else {
            self.shown = current + added;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_seeded_catalog() {
        let catalog = Catalog::seeded(now());
        assert_eq!(catalog.len(), 20);
        let first = catalog.get("img-1").unwrap();
        assert_eq!(first.title, "Mountain Lake Reflection");
        assert_eq!(first.downloads, 1247);
        assert_eq!(first.qualities.get(Quality::High), "/demo/nature-1.jpg");
        assert_eq!(catalog.get("img-16").unwrap().category, Category::Nature);
        // Deterministic across seeds
        assert_eq!(Catalog::seeded(now()).all(), catalog.all());
    }

    #[test]
    fn test_category_and_quality_parsing() {
        assert_eq!(Category::from_str("nature"), Some(Category::Nature));
        assert_eq!(Category::from_str(" Sports "), Some(Category::Sports));
        assert_eq!(Category::from_str("All Categories"), None);
        assert_eq!(Quality::from_str("ORIGINAL"), Some(Quality::Original));
        assert_eq!(Quality::High.resolution(), "1200x1600px");
    }

    #[test]
    fn test_unknown_detail_is_placeholder() {
        let catalog = Catalog::seeded(now());
        let image = catalog.detail("img-999");
        assert_eq!(image.id, "img-999");
        assert_eq!(image.title, "Sample Image");
        assert_eq!(image.downloads, 42);
        assert_eq!(image.likes, 128);
    }

    #[test]
    fn test_views_and_formatting() {
        let catalog = Catalog::seeded(now());
        assert_eq!(catalog.get("img-1").unwrap().views(), 1870);
        assert_eq!(catalog.get("img-2").unwrap().views(), 1284);
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(short_date(&ts), "Jan 15, 2024");
        assert_eq!(long_date(&ts), "Monday, January 15, 2024");
        assert_eq!(format_count(892), "892");
        assert_eq!(format_count(1247), "1.2k");
    }

    #[test]
    fn test_filter_search_and_category() {
        let catalog = Catalog::seeded(now());
        let mut filter = Filter::default();
        filter.search = "PORTRAIT".to_string();
        let ids: Vec<&str> = catalog.visible(&filter).map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["img-5", "img-6"]);

        filter.clear();
        filter.category = Some(Category::Technology);
        assert_eq!(catalog.visible(&filter).count(), 4);

        filter.category = Some(Category::Food);
        assert_eq!(catalog.visible(&filter).count(), 0);
    }

    #[test]
    fn test_filter_chips() {
        let mut filter = Filter {
            search: "lake".to_string(),
            category: Some(Category::Nature),
            quality: Some(Quality::High),
        };
        assert_eq!(filter.active_filters(), vec!["Nature", "High"]);

        assert!(filter.remove_filter("high"));
        assert_eq!(filter.quality, None);
        assert!(!filter.remove_filter("Travel"));
        assert_eq!(filter.active_filters(), vec!["Nature"]);

        filter.clear();
        assert!(filter.active_filters().is_empty());
        assert!(filter.search.is_empty());
    }

    #[test]
    fn test_drafts_hidden_from_gallery() {
        let mut catalog = Catalog::seeded(now());
        catalog.get_mut("img-1").unwrap().status = ImageStatus::Draft;
        let filter = Filter::default();
        assert_eq!(catalog.visible(&filter).count(), 19);
        assert!(catalog.visible(&filter).all(|i| i.id != "img-1"));
    }

    #[test]
    fn test_pager_twelve_then_eight() {
        let mut pager = Pager::new(12, 8);
        assert_eq!(pager.shown(20), 12);
        assert_eq!(pager.load_more(20), 8);
        assert_eq!(pager.shown(20), 20);
        assert!(pager.has_more());
        // Nothing left: end of gallery
        assert_eq!(pager.load_more(20), 0);
        assert!(!pager.has_more());
        assert_eq!(pager.load_more(20), 0);

        pager.reset();
        assert!(pager.has_more());
        assert_eq!(pager.shown(20), 12);
    }

    #[test]
    fn test_pager_small_result_set() {
        let mut pager = Pager::new(12, 8);
        assert_eq!(pager.shown(4), 4);
        assert_eq!(pager.load_more(4), 0);
        assert!(!pager.has_more());
    }

    #[test]
    fn test_insert_front_and_remove() {
        let mut catalog = Catalog::seeded(now());
        let mut image = catalog.detail("img-new");
        image.title = "Fresh".to_string();
        catalog.insert_front(image.clone()).unwrap();
        assert_eq!(catalog.all()[0].id, "img-new");
        assert!(catalog.insert_front(image).is_err());

        let removed = catalog.remove("img-new").unwrap();
        assert_eq!(removed.title, "Fresh");
        assert!(catalog.remove("img-new").is_none());
    }
}
