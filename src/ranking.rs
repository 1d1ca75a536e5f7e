//! Top-rated selection over a publication-date window.
//!
//! Dates are compared as UTC+3 calendar days and both ends of the period are
//! inclusive. Results are ordered by rating, highest first; ties keep feed
//! order.

use crate::api::PageSource;
use crate::config::SCAN_PAGE_SIZE;
use crate::error::Result;
use crate::models::News;
use chrono::NaiveDate;
use itertools::Itertools;
use std::cmp::Ordering;
use std::ops::RangeInclusive;
use tracing::{debug, info, instrument};

fn by_rating_desc(a: &&News, b: &&News) -> Ordering {
    b.rating().total_cmp(&a.rating())
}

/// Whether `news` was published on a UTC+3 day inside `period`.
///
/// # Arguments
///
/// * `news` - The headline to check
/// * `period` - Inclusive range of calendar days
///
/// # Returns
///
/// `false` for headlines whose timestamp cannot be represented.
pub fn in_period(news: &News, period: &RangeInclusive<NaiveDate>) -> bool {
    news.published_on().is_some_and(|day| period.contains(&day))
}

/// The `count` best rated headlines of `items` published within `period`.
///
/// # Arguments
///
/// * `items` - Candidate headlines, in feed order
/// * `count` - Maximum number of headlines returned
/// * `period` - Inclusive range of UTC+3 calendar days
///
/// # Returns
///
/// At most `count` headlines, highest rating first.
#[instrument(level = "info", skip(items), fields(items = items.len()))]
pub fn most_rated(items: &[News], count: usize, period: &RangeInclusive<NaiveDate>) -> Vec<News> {
    items
        .iter()
        .sorted_by(by_rating_desc)
        .filter(|news| in_period(news, period))
        .take(count)
        .cloned()
        .collect()
}

/// Walk the whole feed (newest first) and pick the best rated headlines in `period`.
///
/// Paging stops at the first headline older than the period start, or at
/// the first short page.
///
/// # Arguments
///
/// * `source` - Feed to scan, page by page
/// * `count` - Maximum number of headlines returned
/// * `period` - Inclusive range of UTC+3 calendar days
///
/// # Errors
///
/// The first failed page fetch. No partial result is returned.
#[instrument(level = "info", skip(source))]
pub async fn most_rated_among_all<S: PageSource>(
    source: &S,
    count: usize,
    period: &RangeInclusive<NaiveDate>,
) -> Result<Vec<News>> {
    let mut candidates: Vec<News> = Vec::new();
    let mut page_no = 1u32;

    'pages: loop {
        let page = source.fetch_page(page_no, SCAN_PAGE_SIZE).await?;
        let last = page.is_last();
        for news in page.items {
            match news.published_on() {
                Some(day) if day < *period.start() => {
                    info!(page = page_no, "Reached headlines older than the period");
                    break 'pages;
                }
                Some(day) if day <= *period.end() => candidates.push(news),
                _ => {}
            }
        }
        if last {
            info!(page = page_no, "Reached the last page of the feed");
            break;
        }
        debug!(page = page_no, candidates = candidates.len(), "Page scanned");
        page_no += 1;
    }

    Ok(candidates
        .iter()
        .sorted_by(by_rating_desc)
        .take(count)
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, sample_news};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> Vec<News> {
        vec![
            sample_news(1, 4, 0, 1710507332),
            sample_news(2, 2, 0, 1600000000),
            sample_news(3, 1, 0, 2000000000),
            sample_news(4, 3, 0, 1500000000),
            sample_news(5, 0, 0, 1700508832),
            sample_news(6, 5, 0, 1710507332),
            sample_news(7, 7, 0, 1600000000),
            sample_news(8, 3, 0, 1710534332),
            sample_news(9, 2, 0, 1500000000),
            sample_news(10, 1, 0, 1710508822),
        ]
    }

    /// Feed ordered newest first, served in slices.
    struct ScanFeed {
        items: Vec<News>,
        calls: Mutex<Vec<u32>>,
    }

    impl PageSource for ScanFeed {
        async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page> {
            self.calls.lock().unwrap().push(page);
            let start = ((page - 1) * page_size) as usize;
            let items = self
                .items
                .iter()
                .skip(start)
                .take(page_size as usize)
                .cloned()
                .collect();
            Ok(Page::new(items, page_size as usize))
        }
    }

    fn hourly_feed(len: usize) -> ScanFeed {
        let newest = 1726000000i64;
        let items = (0..len)
            .map(|i| sample_news(i as u64 + 1, (i % 13) as u64, (i % 5) as u64, newest - i as i64 * 3600))
            .collect();
        ScanFeed {
            items,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_most_rated_filters_period_and_sorts() {
        let period = day(2024, 1, 15)..=day(2024, 9, 15);
        let top = most_rated(&fixture(), 3, &period);
        let ids: Vec<u64> = top.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![6, 1, 8]);
        assert!(top.windows(2).all(|w| w[0].rating() >= w[1].rating()));
    }

    #[test]
    fn test_most_rated_period_bounds_are_inclusive() {
        // 1710507332 is 2024-03-15 in UTC+3.
        let period = day(2024, 3, 15)..=day(2024, 3, 15);
        let top = most_rated(&fixture(), 10, &period);
        let ids: BTreeSet<u64> = top.iter().map(|n| n.id).collect();
        assert_eq!(ids, [1, 6, 8, 10].into_iter().collect());
    }

    #[test]
    fn test_most_rated_empty_when_nothing_in_period() {
        let period = day(1999, 1, 1)..=day(1999, 12, 31);
        assert!(most_rated(&fixture(), 5, &period).is_empty());
        assert!(most_rated(&fixture(), 0, &(day(2024, 1, 1)..=day(2024, 12, 31))).is_empty());
    }

    #[tokio::test]
    async fn test_scan_stops_at_older_headlines() {
        let feed = hourly_feed(2_500);
        let period = day(2024, 7, 20)..=day(2024, 9, 5);

        let top = most_rated_among_all(&feed, 50, &period).await.unwrap();
        assert_eq!(*feed.calls.lock().unwrap(), vec![1, 2]);
        assert_eq!(top.len(), 50);
        assert!(top.iter().all(|n| in_period(n, &period)));
        assert!(top.windows(2).all(|w| w[0].rating() >= w[1].rating()));
        assert_eq!(top, most_rated(&feed.items, 50, &period));
    }

    #[tokio::test]
    async fn test_scan_stops_at_short_page() {
        let feed = hourly_feed(300);
        let period = day(2000, 1, 1)..=day(2030, 1, 1);

        let top = most_rated_among_all(&feed, 1_000, &period).await.unwrap();
        assert_eq!(*feed.calls.lock().unwrap(), vec![1]);
        assert_eq!(top.len(), 300);
    }
}
