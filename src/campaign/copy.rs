//! Template text for campaign plans. Everything here is a pure function of
//! already-computed aggregates.

use serde::{Deserialize, Serialize};

use crate::analytics::{BusinessAnalytics, ProductStats, SalesStats, TopSeller};
use crate::types::Business;

/// Split of the ad budget; the last channel absorbs rounding.
const AD_SPLIT: [(&str, u8); 2] = [("Facebook/Instagram Ads", 60), ("Google Ads", 40)];

/// Revenue above which the plan calls out sales momentum.
const MOMENTUM_REVENUE: f64 = 100_000.0;

/// Product count below which the plan suggests a wider range.
const NARROW_RANGE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub percent: u8,
    pub amount: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdCopy {
    pub platform: String,
    pub headline: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cta: Option<String>,
    pub budget_allocation: BudgetAllocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Tip,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub kind: InsightKind,
    pub message: String,
}

impl Insight {
    fn new(title: &str, kind: InsightKind, message: String) -> Self {
        Self {
            title: title.to_string(),
            kind,
            message,
        }
    }
}

/// Formats an amount with thousands separators and two decimals: `1234567.5`
/// becomes `1,234,567.50`.
#[must_use]
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// `format_amount` prefixed with the currency label.
#[must_use]
pub fn format_money(currency: &str, value: f64) -> String {
    format!("{currency} {}", format_amount(value))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn hashtag(name: &str) -> String {
    name.split_whitespace().collect()
}

fn category_list(products: &ProductStats, fallback: &str) -> String {
    if products.categories.is_empty() {
        return fallback.to_string();
    }
    products
        .categories
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn top_seller_lines(top: &[TopSeller], currency: &str) -> String {
    if top.is_empty() {
        return "No sales data available yet".to_string();
    }
    top.iter()
        .map(|t| {
            format!(
                "- {}: {} units, {}",
                t.product,
                t.quantity,
                format_money(currency, t.revenue)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn summary(
    goal: &str,
    budget: f64,
    analytics: &BusinessAnalytics,
    currency: &str,
) -> String {
    let products = &analytics.product_analysis;
    let sales = &analytics.sales_analysis;
    let categories = if products.categories.is_empty() {
        "None".to_string()
    } else {
        products.categories.join(", ")
    };

    format!(
        "Campaign Goal: {goal}\n\
         Budget: {budget}\n\
         \n\
         Business Analysis:\n\
         - Total Products: {total_products}\n\
         - Categories: {categories}\n\
         - Price Range: {min} - {max}\n\
         - Total Sales: {units} units\n\
         - Total Revenue: {revenue}\n\
         \n\
         Top Selling Products:\n\
         {top}\n\
         \n\
         Recommended Actions:\n\
         1. Focus on top-performing products\n\
         2. Create targeted social media campaigns\n\
         3. Offer promotions on high-margin items\n\
         4. Use WhatsApp for direct customer engagement\n",
        budget = format_money(currency, budget),
        total_products = products.total_products,
        min = format_money(currency, products.price_range.min),
        max = format_money(currency, products.price_range.max),
        units = sales.total_sales,
        revenue = format_money(currency, sales.total_revenue),
        top = top_seller_lines(&sales.top_selling, currency),
    )
}

#[must_use]
pub fn social_posts(business: &Business, products: &ProductStats) -> Vec<SocialPost> {
    let tag = hashtag(&business.name);
    let place = hashtag(&business.location);
    let local_tag = if place.is_empty() {
        String::new()
    } else {
        format!(" #{place}")
    };

    let featured = if products.top_products.is_empty() {
        "our products".to_string()
    } else {
        products
            .top_products
            .iter()
            .take(3)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let post = |platform: &str, content: String| SocialPost {
        platform: platform.to_string(),
        content,
    };

    vec![
        post(
            "Instagram",
            format!(
                "Special offer alert! Shop our top products and enjoy great deals. Limited time only! #ShopLocal #{tag}{local_tag}"
            ),
        ),
        post(
            "Twitter/X",
            format!(
                "Don't miss out! Incredible deals on our best-selling products. DM us to order! #{tag}{local_tag}"
            ),
        ),
        post(
            "Facebook",
            format!(
                "Hi everyone! We have exciting new offers just for you. Check out our {} and more. Contact us today!",
                category_list(products, "products")
            ),
        ),
        post(
            "WhatsApp",
            format!("Hello! We have special offers on {featured}. Reply YES to learn more!"),
        ),
    ]
}

/// Splits `budget` across the ad channels. Amounts are rounded to cents and
/// always add up to `budget`.
#[must_use]
pub fn allocate_budget(budget: f64, currency: &str) -> Vec<BudgetAllocation> {
    let mut remaining = budget;
    AD_SPLIT
        .iter()
        .enumerate()
        .map(|(i, (_, percent))| {
            let amount = if i + 1 == AD_SPLIT.len() {
                remaining
            } else {
                round_cents(budget * f64::from(*percent) / 100.0)
            };
            remaining -= amount;
            BudgetAllocation {
                percent: *percent,
                amount,
                label: format!("{} ({percent}%)", format_money(currency, amount)),
            }
        })
        .collect()
}

#[must_use]
pub fn ad_copy(
    business: &Business,
    products: &ProductStats,
    budget: f64,
    currency: &str,
) -> Vec<AdCopy> {
    let lead_category = products.categories.first().map(String::as_str);
    let categories = category_list(products, "products");
    let delivery = if business.location.trim().is_empty() {
        "Order now for fast delivery!".to_string()
    } else {
        format!("Order now for fast delivery across {}!", business.location.trim())
    };

    let mut allocations = allocate_budget(budget, currency).into_iter();
    let mut ads = Vec::with_capacity(AD_SPLIT.len());

    if let Some(allocation) = allocations.next() {
        ads.push(AdCopy {
            platform: AD_SPLIT[0].0.to_string(),
            headline: format!("Shop Quality {}", lead_category.unwrap_or("Products")),
            text: format!(
                "Discover great deals at {}! We offer the best {categories} at unbeatable prices. {delivery}",
                business.name
            ),
            cta: Some("Shop Now".to_string()),
            budget_allocation: allocation,
        });
    }

    if let Some(allocation) = allocations.next() {
        ads.push(AdCopy {
            platform: AD_SPLIT[1].0.to_string(),
            headline: format!(
                "Buy {} | {}",
                lead_category.unwrap_or("Quality Products"),
                business.name
            ),
            text: format!("Best prices on {categories}. Fast delivery. Order today!"),
            cta: None,
            budget_allocation: allocation,
        });
    }

    ads
}

#[must_use]
pub fn insights(products: &ProductStats, sales: &SalesStats, currency: &str) -> Vec<Insight> {
    let mut insights = Vec::new();

    if products.total_products < NARROW_RANGE {
        insights.push(Insight::new(
            "Diversify Your Range",
            InsightKind::Warning,
            format!(
                "You list {} product(s). Adding a few related items gives customers more reasons to buy.",
                products.total_products
            ),
        ));
    } else {
        insights.push(Insight::new(
            "Product Diversity",
            InsightKind::Tip,
            format!(
                "You have {} products across {} categories. Consider cross-selling related items.",
                products.total_products,
                products.categories.len()
            ),
        ));
    }

    if sales.order_count > 0 {
        insights.push(Insight::new(
            "Average Order Value",
            InsightKind::Tip,
            format!(
                "Your average order value is {}. Try bundling products to increase it.",
                format_money(currency, sales.average_order_value)
            ),
        ));
    }

    if sales.total_revenue >= MOMENTUM_REVENUE {
        insights.push(Insight::new(
            "Sales Momentum",
            InsightKind::Success,
            format!(
                "You have already made {} in sales. Reinvest part of it in the channels that are working.",
                format_money(currency, sales.total_revenue)
            ),
        ));
    }

    if let Some(star) = sales.top_selling.first() {
        insights.push(Insight::new(
            "Star Product",
            InsightKind::Success,
            format!(
                "{} is your best seller! Feature it prominently in your campaigns.",
                star.product
            ),
        ));
    }

    insights.push(Insight::new(
        "Market Timing",
        InsightKind::Tip,
        "Launch campaigns right after payday (1st-5th and 25th-30th of the month) for better engagement."
            .to_string(),
    ));

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analytics::ProductSummary;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(100.0), "100.00");
        assert_eq!(format_amount(-2500.0), "-2,500.00");
        assert_eq!(format_money("KSh", 50000.0), "KSh 50,000.00");
    }

    #[test]
    fn test_allocations_sum_to_budget() {
        for budget in [1.0, 0.01, 333.33, 50_000.0, 12_345.67, 1e9 + 0.07] {
            let allocations = allocate_budget(budget, "KSh");
            assert_eq!(allocations.len(), 2);
            assert_eq!(allocations[0].percent, 60);
            assert_eq!(allocations[1].percent, 40);

            let total: f64 = allocations.iter().map(|a| a.amount).sum();
            assert!((total - budget).abs() < 1e-6, "budget {budget} summed to {total}");
        }

        let split = allocate_budget(50_000.0, "KSh");
        assert_eq!(split[0].label, "KSh 30,000.00 (60%)");
        assert_eq!(split[1].label, "KSh 20,000.00 (40%)");
    }

    #[test]
    fn test_insight_thresholds() {
        let few = ProductStats {
            total_products: 2,
            ..ProductStats::default()
        };
        let titles = |list: Vec<Insight>| -> Vec<String> {
            list.into_iter().map(|i| i.title).collect()
        };

        assert_eq!(
            titles(insights(&few, &SalesStats::default(), "KSh")),
            ["Diversify Your Range", "Market Timing"]
        );

        let many = ProductStats {
            total_products: 6,
            categories: vec!["Bath".to_string()],
            ..ProductStats::default()
        };
        let busy = SalesStats {
            total_sales: 40,
            total_revenue: 150_000.0,
            order_count: 10,
            average_order_value: 15_000.0,
            top_selling: vec![TopSeller {
                product: "Soap".to_string(),
                quantity: 40,
                revenue: 150_000.0,
            }],
        };
        assert_eq!(
            titles(insights(&many, &busy, "KSh")),
            [
                "Product Diversity",
                "Average Order Value",
                "Sales Momentum",
                "Star Product",
                "Market Timing",
            ]
        );
    }

    #[test]
    fn test_posts_fall_back_without_data() {
        let business = Business {
            id: "biz".to_string(),
            owner_id: "owner".to_string(),
            name: "Mama Mboga Fresh".to_string(),
            slug: "mama-mboga-fresh".to_string(),
            industry: "grocery".to_string(),
            location: String::new(),
            created_at: chrono::Utc::now(),
        };

        let posts = social_posts(&business, &ProductStats::default());
        let platforms: Vec<&str> = posts.iter().map(|p| p.platform.as_str()).collect();
        assert_eq!(platforms, ["Instagram", "Twitter/X", "Facebook", "WhatsApp"]);
        assert!(posts[0].content.contains("#MamaMbogaFresh"));
        assert!(posts[2].content.contains("our products and more"));
        assert!(posts[3].content.contains("offers on our products."));

        let stocked = ProductStats {
            total_products: 1,
            categories: vec!["Greens".to_string()],
            top_products: vec![ProductSummary {
                name: "Sukuma".to_string(),
                price: 30.0,
                category: "Greens".to_string(),
            }],
            ..ProductStats::default()
        };
        let posts = social_posts(&business, &stocked);
        assert!(posts[2].content.contains("our Greens and more"));
        assert!(posts[3].content.contains("offers on Sukuma."));
    }
}
