//! Center filtering and bucketing
//!
//! Derives the visible subset of centers from the map/list filter state:
//! category chip, text search, occupancy toggles and price band. Every
//! predicate is permissive about missing data, so a center is only dropped
//! when a field it actually has fails a filter.

use serde::{Deserialize, Serialize};

use crate::category::{CategorySelection, CenterCategory};
use crate::models::{Center, Plan};

/// Upper bound (inclusive) of the green occupancy band
pub const GREEN_MAX: f64 = 25.0;

/// Upper bound (inclusive) of the orange occupancy band
pub const ORANGE_MAX: f64 = 75.0;

/// Prices below this are "low"
pub const LOW_PRICE_BELOW: u64 = 3000;

/// Prices above this are "high"
pub const HIGH_PRICE_ABOVE: u64 = 5000;

/// Occupancy band filter; the variants make the toggles exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccupancyFilter {
    #[default]
    Any,
    /// Max occupancy ≤ 25
    Green,
    /// Max occupancy in 26–75
    Orange,
}

impl OccupancyFilter {
    pub fn matches(&self, center: &Center) -> bool {
        let max = center.occupancy.max();
        match self {
            OccupancyFilter::Any => true,
            OccupancyFilter::Green => max <= GREEN_MAX,
            OccupancyFilter::Orange => max > GREEN_MAX && max <= ORANGE_MAX,
        }
    }
}

/// Price band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriceRange {
    pub fn parse(raw: &str) -> PriceRange {
        match raw.trim().to_lowercase().as_str() {
            "low" => PriceRange::Low,
            "medium" => PriceRange::Medium,
            "high" => PriceRange::High,
            _ => PriceRange::All,
        }
    }

    pub fn contains(&self, price: u64) -> bool {
        match self {
            PriceRange::All => true,
            PriceRange::Low => price < LOW_PRICE_BELOW,
            PriceRange::Medium => (LOW_PRICE_BELOW..=HIGH_PRICE_ABOVE).contains(&price),
            PriceRange::High => price > HIGH_PRICE_ABOVE,
        }
    }

    /// Centers without a parseable price pass every band
    pub fn matches(&self, center: &Center) -> bool {
        match parse_center_price(center) {
            Some(price) => self.contains(price),
            None => true,
        }
    }
}

/// Filter panel toggles as the client sends them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterToggles {
    pub only_green: bool,
    pub only_orange: bool,
    pub price_range: PriceRange,
}

impl FilterToggles {
    /// Flip the green toggle; orange is always switched off
    pub fn toggle_green(&mut self) {
        self.only_green = !self.only_green;
        self.only_orange = false;
    }

    /// Flip the orange toggle; green is always switched off
    pub fn toggle_orange(&mut self) {
        self.only_orange = !self.only_orange;
        self.only_green = false;
    }

    /// Select a price band, or clear it when the same band is selected again
    pub fn toggle_price(&mut self, range: PriceRange) {
        self.price_range = if self.price_range == range {
            PriceRange::All
        } else {
            range
        };
    }

    /// Green takes precedence if both flags arrive set
    pub fn occupancy_filter(&self) -> OccupancyFilter {
        if self.only_green {
            OccupancyFilter::Green
        } else if self.only_orange {
            OccupancyFilter::Orange
        } else {
            OccupancyFilter::Any
        }
    }
}

/// Complete filter state for a center listing
#[derive(Debug, Clone, Default)]
pub struct CenterFilter {
    pub category: CategorySelection,
    pub query: String,
    pub occupancy: OccupancyFilter,
    pub price: PriceRange,
}

impl CenterFilter {
    pub fn new(selected_category: &str, search_query: &str, toggles: FilterToggles) -> Self {
        Self {
            category: CategorySelection::parse(selected_category),
            query: search_query.trim().to_lowercase(),
            occupancy: toggles.occupancy_filter(),
            price: toggles.price_range,
        }
    }

    /// Drop the occupancy predicate (viewers who cannot see occupancy)
    pub fn without_occupancy(mut self) -> Self {
        self.occupancy = OccupancyFilter::Any;
        self
    }

    pub fn matches(&self, center: &Center) -> bool {
        matches_category(center, self.category)
            && self.occupancy.matches(center)
            && self.price.matches(center)
            && matches_query(center, &self.query)
    }

    pub fn apply<'a>(&self, centers: &'a [Center]) -> Vec<&'a Center> {
        centers.iter().filter(|c| self.matches(c)).collect()
    }
}

/// Convenience wrapper over [`CenterFilter`]
pub fn filter_centers<'a>(
    centers: &'a [Center],
    selected_category: &str,
    search_query: &str,
    toggles: FilterToggles,
) -> Vec<&'a Center> {
    CenterFilter::new(selected_category, search_query, toggles).apply(centers)
}

pub fn matches_category(center: &Center, selection: CategorySelection) -> bool {
    match selection {
        CategorySelection::All => true,
        CategorySelection::Vip => is_special(center),
        CategorySelection::Category(wanted) => {
            CenterCategory::normalize(center.category.as_deref()) == wanted
        }
    }
}

/// `query` must already be trimmed and lowercased
fn matches_query(center: &Center, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let includes = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(query));
    includes(Some(center.name.as_str()))
        || includes(center.address.as_deref())
        || includes(center.description.as_deref())
}

/// All digits of a price string read as one number ("3,500₮" → 3500)
pub fn parse_price_digits(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Standard price, falling back to the legacy `price` field
pub fn parse_center_price(center: &Center) -> Option<u64> {
    center
        .pricing
        .standard
        .as_deref()
        .and_then(parse_price_digits)
        .or_else(|| center.price.as_deref().and_then(parse_price_digits))
}

/// Owner is on the featured plan
pub fn is_special(center: &Center) -> bool {
    center.owner_plan() == Plan::BusinessPro
}

pub fn has_bonus(center: &Center) -> bool {
    !center.bonus.is_empty()
}

/// List-view partition. `bonus` overlaps the other two buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CenterBuckets<'a> {
    pub bonus: Vec<&'a Center>,
    pub special: Vec<&'a Center>,
    pub regular: Vec<&'a Center>,
}

pub fn bucket_centers<'a, I>(centers: I) -> CenterBuckets<'a>
where
    I: IntoIterator<Item = &'a Center>,
{
    let mut buckets = CenterBuckets::default();
    for center in centers {
        if has_bonus(center) {
            buckets.bonus.push(center);
        }
        if is_special(center) {
            buckets.special.push(center);
        } else {
            buckets.regular.push(center);
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bonus, Occupancy};
    use uuid::Uuid;

    fn center(name: &str) -> Center {
        Center::new(name.to_string())
    }

    fn with_standard_occupancy(pct: f64) -> Center {
        let mut c = center("Occ");
        c.occupancy = Occupancy {
            standard: Some(pct),
            vip: None,
            stage: None,
        };
        c
    }

    fn with_price(price: &str) -> Center {
        let mut c = center("Priced");
        c.pricing.standard = Some(price.to_string());
        c
    }

    fn green() -> FilterToggles {
        FilterToggles {
            only_green: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_green_band() {
        let centers = vec![with_standard_occupancy(20.0), with_standard_occupancy(30.0)];
        let visible = filter_centers(&centers, "all", "", green());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].occupancy.standard, Some(20.0));
    }

    #[test]
    fn test_orange_band_boundaries() {
        let orange = FilterToggles {
            only_orange: true,
            ..Default::default()
        };
        let filter = CenterFilter::new("all", "", orange);
        assert!(!filter.matches(&with_standard_occupancy(25.0)));
        assert!(filter.matches(&with_standard_occupancy(26.0)));
        assert!(filter.matches(&with_standard_occupancy(75.0)));
        assert!(!filter.matches(&with_standard_occupancy(76.0)));
    }

    #[test]
    fn test_occupancy_uses_max_of_fields() {
        let mut c = with_standard_occupancy(10.0);
        c.occupancy.vip = Some(60.0);
        assert!(!CenterFilter::new("all", "", green()).matches(&c));
    }

    #[test]
    fn test_missing_occupancy_counts_as_zero() {
        assert!(CenterFilter::new("all", "", green()).matches(&center("Empty")));
    }

    #[test]
    fn test_low_price_excludes_3000_and_above() {
        let low = FilterToggles {
            price_range: PriceRange::Low,
            ..Default::default()
        };
        let filter = CenterFilter::new("all", "", low);
        assert!(filter.matches(&with_price("2,500₮")));
        assert!(!filter.matches(&with_price("3000")));
        assert!(!filter.matches(&with_price("7 000₮")));
    }

    #[test]
    fn test_medium_and_high_bands() {
        assert!(PriceRange::Medium.contains(3000));
        assert!(PriceRange::Medium.contains(5000));
        assert!(!PriceRange::Medium.contains(5001));
        assert!(PriceRange::High.contains(5001));
        assert!(!PriceRange::High.contains(5000));
    }

    #[test]
    fn test_price_falls_back_to_legacy_field() {
        let mut c = center("Legacy");
        c.price = Some("4000₮/цаг".into());
        assert_eq!(parse_center_price(&c), Some(4000));

        c.pricing.standard = Some("free".into());
        assert_eq!(parse_center_price(&c), Some(4000));
    }

    #[test]
    fn test_unpriced_center_passes_price_filter() {
        assert!(PriceRange::High.matches(&center("Unknown price")));
    }

    #[test]
    fn test_vip_selects_business_pro_owners() {
        let pro = center("Pro").with_owner(Uuid::new_v4(), Plan::BusinessPro);
        let std = center("Std").with_owner(Uuid::new_v4(), Plan::BusinessStandard);
        let none = center("None");
        let centers = vec![pro, std, none];

        let visible = filter_centers(&centers, "vip", "", FilterToggles::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Pro");
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut hall = center("ABC Gaming Hall");
        hall.address = Some("Sukhbaatar".into());
        let mut other = center("Cue Club");
        other.description = Some("Quiet billiards".into());
        let centers = vec![hall, other];

        let visible = filter_centers(&centers, "all", "gaming", FilterToggles::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "ABC Gaming Hall");

        let visible = filter_centers(&centers, "all", "  BILLIARDS ", FilterToggles::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Cue Club");
    }

    #[test]
    fn test_null_category_matches_gaming() {
        let centers = vec![center("No category"), center("PC").with_category("pc")];
        let visible = filter_centers(&centers, "gaming", "", FilterToggles::default());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "No category");
    }

    #[test]
    fn test_toggles_are_exclusive() {
        let mut toggles = FilterToggles::default();
        toggles.toggle_orange();
        assert!(toggles.only_orange);

        toggles.toggle_green();
        assert!(toggles.only_green);
        assert!(!toggles.only_orange);

        toggles.toggle_orange();
        assert!(!toggles.only_green);
        assert!(toggles.only_orange);
    }

    #[test]
    fn test_price_toggle_clears_on_repeat() {
        let mut toggles = FilterToggles::default();
        toggles.toggle_price(PriceRange::Low);
        assert_eq!(toggles.price_range, PriceRange::Low);
        toggles.toggle_price(PriceRange::Low);
        assert_eq!(toggles.price_range, PriceRange::All);
    }

    #[test]
    fn test_without_occupancy_ignores_bands() {
        let filter = CenterFilter::new("all", "", green()).without_occupancy();
        assert!(filter.matches(&with_standard_occupancy(90.0)));
    }

    #[test]
    fn test_buckets() {
        let mut bonus_pro = center("Bonus Pro").with_owner(Uuid::new_v4(), Plan::BusinessPro);
        bonus_pro.bonus.push(Bonus {
            title: Some("Free hour".into()),
            ..Default::default()
        });
        let plain = center("Plain");
        let centers = vec![bonus_pro, plain];

        let buckets = bucket_centers(&centers);
        assert_eq!(buckets.bonus.len(), 1);
        assert_eq!(buckets.special.len(), 1);
        assert_eq!(buckets.regular.len(), 1);
        assert_eq!(buckets.regular[0].name, "Plain");
    }
}
