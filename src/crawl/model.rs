//! Decoded listing payload structures
//!
//! A listing response is a paginated JSON payload: page numbers, a total
//! page count discovered incrementally from each page's own payload, and a
//! batch of items each carrying zero or more media URLs. Unknown payload
//! keys are ignored.

use serde::Deserialize;

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PageListing {
    pub status: String,
    pub current_page: u32,
    pub page_count: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub items: Vec<ListingItem>,
}

/// One item discovered on a listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingItem {
    pub id: String,
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
}

impl ListingItem {
    /// Media URLs joined for flat single-column storage.
    pub fn joined_media(&self) -> String {
        self.media.join(";")
    }
}
