use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reactions::{ReactionAggregate, ReactionType};

pub mod handler;

pub const FEED_DEFAULT_LIMIT: i64 = 20;
pub const FEED_MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Display info for the user who posted a feed item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOwner {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// One check-in as seen in a follower's feed: core fields, owner display
/// info, per-type reaction aggregates, and the viewer's own reactions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: Uuid,
    pub photo_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub location: Option<String>,
    pub device_info: Option<String>,
    pub user: FeedOwner,
    pub reactions: Vec<ReactionAggregate>,
    pub user_reactions: Vec<ReactionType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(requested_page: i64, limit: i64, total: i64) -> Self {
        let (page, total_pages) = page_window(requested_page, total, limit);
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub checkins: Vec<FeedItem>,
    pub pagination: Pagination,
}

/// Clamp a requested page against the row count. Returns
/// `(page, total_pages)`: the page is at least 1 and, when any rows
/// exist, at most the last populated page.
pub fn page_window(requested_page: i64, total: i64, page_size: i64) -> (i64, i64) {
    let total_pages = if total > 0 {
        (total + page_size - 1) / page_size
    } else {
        0
    };
    let requested = requested_page.max(1);
    let page = if total_pages > 0 {
        requested.min(total_pages)
    } else {
        1
    };
    (page, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_collapses_to_page_one() {
        assert_eq!(page_window(1, 0, 20), (1, 0));
        assert_eq!(page_window(7, 0, 20), (1, 0));
    }

    #[test]
    fn page_clamps_to_at_least_one() {
        assert_eq!(page_window(0, 45, 20), (1, 3));
        assert_eq!(page_window(-3, 45, 20), (1, 3));
    }

    #[test]
    fn page_beyond_last_clamps_to_last() {
        assert_eq!(page_window(99, 45, 20), (3, 3));
        assert_eq!(page_window(4, 60, 20), (3, 3));
    }

    #[test]
    fn in_range_page_kept() {
        assert_eq!(page_window(2, 45, 20), (2, 3));
    }

    #[test]
    fn pagination_flags() {
        let first = Pagination::new(1, 20, 45);
        assert!(first.has_next);
        assert!(!first.has_prev);

        let middle = Pagination::new(2, 20, 45);
        assert!(middle.has_next);
        assert!(middle.has_prev);

        let last = Pagination::new(3, 20, 45);
        assert!(!last.has_next);
        assert!(last.has_prev);

        let empty = Pagination::new(1, 20, 0);
        assert_eq!(empty.page, 1);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn exact_multiple_has_no_partial_page() {
        assert_eq!(page_window(2, 40, 20), (2, 2));
    }
}
