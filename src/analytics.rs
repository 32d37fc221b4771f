//! Descriptive statistics over a business's canonical products and sales.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scope::ScopedBusiness;
use crate::store::Store;
use crate::types::{Product, SalesRecord};

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductStats {
    pub total_products: usize,
    pub categories: Vec<String>,
    pub price_range: PriceRange,
    /// Most expensive products first.
    pub top_products: Vec<ProductSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSeller {
    pub product: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesStats {
    /// Units sold across every sales record.
    pub total_sales: i64,
    pub total_revenue: f64,
    pub order_count: usize,
    pub average_order_value: f64,
    pub top_selling: Vec<TopSeller>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessAnalytics {
    pub product_analysis: ProductStats,
    pub sales_analysis: SalesStats,
}

#[must_use]
pub fn analyze_products(products: &[Product]) -> ProductStats {
    if products.is_empty() {
        return ProductStats::default();
    }

    let categories: BTreeSet<&str> = products
        .iter()
        .map(|p| p.category.trim())
        .filter(|c| !c.is_empty())
        .collect();

    let price_range = products.iter().fold(
        PriceRange {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        },
        |range, p| PriceRange {
            min: range.min.min(p.price),
            max: range.max.max(p.price),
        },
    );

    let mut ranked: Vec<&Product> = products.iter().collect();
    ranked.sort_by(|a, b| {
        b.price
            .total_cmp(&a.price)
            .then_with(|| a.name.cmp(&b.name))
    });

    ProductStats {
        total_products: products.len(),
        categories: categories.into_iter().map(str::to_string).collect(),
        price_range,
        top_products: ranked
            .into_iter()
            .take(TOP_N)
            .map(|p| ProductSummary {
                name: p.name.clone(),
                price: p.price,
                category: p.category.clone(),
            })
            .collect(),
    }
}

#[must_use]
pub fn analyze_sales(sales: &[SalesRecord]) -> SalesStats {
    if sales.is_empty() {
        return SalesStats::default();
    }

    let mut by_product: BTreeMap<&str, (i64, f64)> = BTreeMap::new();
    for sale in sales {
        let entry = by_product.entry(sale.product_name.as_str()).or_default();
        entry.0 = entry.0.saturating_add(sale.quantity);
        entry.1 += sale.revenue;
    }

    let mut top_selling: Vec<TopSeller> = by_product
        .into_iter()
        .map(|(product, (quantity, revenue))| TopSeller {
            product: product.to_string(),
            quantity,
            revenue,
        })
        .collect();
    top_selling.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product.cmp(&b.product))
    });
    top_selling.truncate(TOP_N);

    // Quantities are only bounded by i64; clamp rather than wrap.
    let total_sales = sales
        .iter()
        .map(|s| s.quantity)
        .fold(0i64, i64::saturating_add);
    let total_revenue: f64 = sales.iter().map(|s| s.revenue).sum();
    let order_count = sales.len();

    SalesStats {
        total_sales,
        total_revenue,
        order_count,
        average_order_value: total_revenue / order_count as f64,
        top_selling,
    }
}

/// Loads the business's products and sales and summarizes both.
pub fn analyze(store: &dyn Store, scope: &ScopedBusiness) -> Result<BusinessAnalytics> {
    let products = store.list_products(scope.id())?;
    let sales = store.list_sales(scope.id())?;

    Ok(BusinessAnalytics {
        product_analysis: analyze_products(&products),
        sales_analysis: analyze_sales(&sales),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use serde_json::Map;

    fn product(name: &str, price: f64, category: &str) -> Product {
        Product {
            id: name.to_string(),
            business_id: "biz".to_string(),
            name: name.to_string(),
            sku: None,
            category: category.to_string(),
            price,
            cost_price: 0.0,
            attributes: Map::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale(product: &str, quantity: i64, revenue: f64) -> SalesRecord {
        SalesRecord {
            id: format!("{product}-{quantity}"),
            business_id: "biz".to_string(),
            product_id: product.to_string(),
            product_name: product.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            quantity,
            revenue,
            channel: "offline".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_inputs_yield_zeroes() {
        let products = analyze_products(&[]);
        assert_eq!(products.total_products, 0);
        assert_eq!(products.price_range, PriceRange { min: 0.0, max: 0.0 });
        assert!(products.categories.is_empty());

        let sales = analyze_sales(&[]);
        assert_eq!(sales.total_sales, 0);
        assert_eq!(sales.total_revenue, 0.0);
        assert_eq!(sales.average_order_value, 0.0);
        assert!(sales.top_selling.is_empty());
    }

    #[test]
    fn test_product_stats() {
        let stats = analyze_products(&[
            product("Soap", 100.0, "Bath"),
            product("Candle", 250.0, "Home"),
            product("Sponge", 40.0, "Bath"),
            product("Mystery", 250.0, ""),
        ]);

        assert_eq!(stats.total_products, 4);
        assert_eq!(stats.categories, ["Bath", "Home"]);
        assert_eq!(stats.price_range, PriceRange { min: 40.0, max: 250.0 });

        let names: Vec<&str> = stats.top_products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Candle", "Mystery", "Soap", "Sponge"]);
    }

    #[test]
    fn test_top_products_capped() {
        let products: Vec<Product> = (0..8)
            .map(|i| product(&format!("P{i}"), f64::from(i), "Misc"))
            .collect();
        let stats = analyze_products(&products);
        assert_eq!(stats.top_products.len(), TOP_N);
        assert_eq!(stats.top_products[0].name, "P7");
    }

    #[test]
    fn test_top_selling_ties_break_by_name() {
        let stats = analyze_sales(&[
            sale("Soap", 2, 200.0),
            sale("Candle", 3, 90.0),
            sale("Soap", 1, 100.0),
            sale("Brush", 3, 60.0),
            sale("Apron", 1, 10.0),
        ]);

        let order: Vec<(&str, i64)> = stats
            .top_selling
            .iter()
            .map(|t| (t.product.as_str(), t.quantity))
            .collect();
        assert_eq!(order, [("Brush", 3), ("Candle", 3), ("Soap", 3), ("Apron", 1)]);
        assert_eq!(stats.top_selling[2].revenue, 300.0);
    }

    #[test]
    fn test_sales_totals() {
        let stats = analyze_sales(&[sale("Soap", 2, 200.0), sale("Candle", 4, 100.0)]);

        assert_eq!(stats.total_sales, 6);
        assert_eq!(stats.total_revenue, 300.0);
        assert_eq!(stats.order_count, 2);
        assert_eq!(stats.average_order_value, 150.0);
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let stats = analyze_sales(&[
            sale("Soap", i64::MAX, 1.0),
            sale("Soap", i64::MAX - 1, 1.0),
            sale("Candle", 1, 1.0),
        ]);

        assert_eq!(stats.total_sales, i64::MAX);
        assert_eq!(stats.top_selling[0].product, "Soap");
        assert_eq!(stats.top_selling[0].quantity, i64::MAX);
        assert_eq!(stats.top_selling[1].quantity, 1);
    }

    #[test]
    fn test_analyze_reads_through_store() {
        let (_temp, store, scope) = crate::ingest::test_support::scoped_store();
        let analytics = analyze(&store, &scope).unwrap();
        assert_eq!(analytics, BusinessAnalytics::default());
    }
}
