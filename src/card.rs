//! Plain-text cards for printing headlines to a terminal.
//!
//! A card is a small tree of `label: text` lines; each level of nesting is
//! indented by one tab.
//!
//! ```text
//! News: 42
//! 	Title: Open air concert
//! 	Place: 7
//! 		Title: Park
//! ```

use crate::models::{News, Place, TIMESTAMP_FORMAT};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    label: String,
    text: String,
    children: Vec<Card>,
}

impl Card {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: Card) -> Self {
        self.children.push(child);
        self
    }

    /// Append a leaf `label: text`.
    pub fn field(self, label: impl Into<String>, text: impl ToString) -> Self {
        self.child(Card::new(label, text.to_string()))
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}: {}", "\t".repeat(depth), self.label, self.text)?;
        for child in &self.children {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

fn place_card(place: &Place) -> Card {
    Card::new("Place", place.id.to_string())
        .field("Title", &place.title)
        .field("Description", &place.description)
}

impl From<&News> for Card {
    fn from(news: &News) -> Self {
        let published = news
            .published_local()
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| news.publication_date.to_string());

        let mut card = Card::new("News", news.id.to_string())
            .field("Title", &news.title)
            .field("Description", &news.description);
        if let Some(place) = &news.place {
            card = card.child(place_card(place));
        }
        card.field("Site", &news.site_url)
            .field("Published", published)
            .field("Favorites", news.favorites_count)
            .field("Comments", news.comments_count)
            .field("Rating", format!("{:.4}", news.rating()))
    }
}
