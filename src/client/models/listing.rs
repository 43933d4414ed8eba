//! Client-side filtering, searching, sorting and pagination of fetched lists.

use chrono::{DateTime, Duration, Months, Utc};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn apply(self, ord: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Created-date filter. Windows are measured from the start of the current UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateWindow {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
}

impl DateWindow {
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        let day = at.date_naive();
        match self {
            DateWindow::All => true,
            DateWindow::Today => day == today,
            DateWindow::ThisWeek => day >= today - Duration::days(7) && day <= today,
            DateWindow::ThisMonth => {
                let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
                day >= start && day <= today
            }
        }
    }
}

impl FromStr for DateWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(DateWindow::All),
            "today" => Ok(DateWindow::Today),
            "this_week" | "week" => Ok(DateWindow::ThisWeek),
            "this_month" | "month" => Ok(DateWindow::ThisMonth),
            other => Err(format!("unknown date window '{}'", other)),
        }
    }
}

/// Case-insensitive substring search over any of `fields`. A blank term matches all.
pub fn matches_search(term: &str, fields: &[&str]) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    fields.iter().any(|f| f.to_lowercase().contains(&term))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(per_page: usize) -> Self {
        Self { page: 1, per_page: per_page.max(1) }
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.per_page).max(1)
    }

    pub fn go_to(&mut self, page: usize, total: usize) {
        self.page = page.clamp(1, self.total_pages(total));
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> PageView<'a, T> {
        let total = items.len();
        let total_pages = self.total_pages(total);
        let page = self.page.clamp(1, total_pages);
        let start = ((page - 1) * self.per_page).min(total);
        let end = (start + self.per_page).min(total);
        PageView { items: &items[start..end], page, total_pages, total, first_index: start }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageView<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    /// 0-based index of `items[0]` in the full list
    pub first_index: usize,
}

impl<T> PageView<'_, T> {
    /// "Showing 11-20 of 34"
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "Showing 0 of 0".to_string();
        }
        format!("Showing {}-{} of {}", self.first_index + 1, self.first_index + self.items.len(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn search_is_case_insensitive_and_blank_matches() {
        assert!(matches_search("", &["anything"]));
        assert!(matches_search("  contract ", &["Business Contract Review"]));
        assert!(matches_search("SMITH", &["x", "Jane Smith"]));
        assert!(!matches_search("tax", &["Divorce Settlement"]));
    }

    #[test]
    fn date_windows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let early_today = Utc.with_ymd_and_hms(2024, 3, 15, 0, 30, 0).unwrap();
        let five_days = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let three_weeks = Utc.with_ymd_and_hms(2024, 2, 23, 9, 0, 0).unwrap();
        let last_year = Utc.with_ymd_and_hms(2023, 3, 15, 9, 0, 0).unwrap();

        assert!(DateWindow::Today.contains(early_today, now));
        assert!(!DateWindow::Today.contains(five_days, now));
        assert!(DateWindow::ThisWeek.contains(five_days, now));
        assert!(!DateWindow::ThisWeek.contains(three_weeks, now));
        assert!(DateWindow::ThisMonth.contains(three_weeks, now));
        assert!(!DateWindow::ThisMonth.contains(last_year, now));
        assert!(DateWindow::All.contains(last_year, now));
    }

    #[test]
    fn pagination_slices_and_clamps() {
        let items: Vec<u32> = (1..=23).collect();
        let mut p = Pagination::new(10);
        let view = p.slice(&items);
        assert_eq!(view.items, &items[0..10]);
        assert_eq!(view.total_pages, 3);
        assert_eq!(view.summary(), "Showing 1-10 of 23");

        p.go_to(3, items.len());
        let view = p.slice(&items);
        assert_eq!(view.items, &[21, 22, 23]);
        assert_eq!(view.summary(), "Showing 21-23 of 23");

        p.go_to(99, items.len());
        assert_eq!(p.page, 3);

        let empty: Vec<u32> = Vec::new();
        let view = p.slice(&empty);
        assert!(view.items.is_empty());
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.summary(), "Showing 0 of 0");
    }

    #[test]
    fn sort_order_toggles() {
        assert_eq!(SortOrder::Desc.toggled(), SortOrder::Asc);
        assert_eq!(SortOrder::Asc.apply(1.cmp(&2)), std::cmp::Ordering::Less);
        assert_eq!(SortOrder::Desc.apply(1.cmp(&2)), std::cmp::Ordering::Greater);
    }
}
