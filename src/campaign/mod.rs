//! Deterministic campaign plans built from a business's aggregates.

mod calendar;
mod copy;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::{self, BusinessAnalytics, ProductStats, SalesStats};
use crate::error::{Error, Result};
use crate::scope::ScopedBusiness;
use crate::store::Store;
use crate::types::{Business, Campaign};

pub use calendar::{CalendarSlot, HORIZON_DAYS, build_calendar};
pub use copy::{
    AdCopy, BudgetAllocation, Insight, InsightKind, SocialPost, allocate_budget, format_amount,
    format_money,
};

pub const DEFAULT_GOAL: &str = "Increase sales";

/// What the caller asks for. `goal` falls back to [`DEFAULT_GOAL`] when blank.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRequest {
    #[serde(default)]
    pub goal: Option<String>,
    pub budget: f64,
}

impl CampaignRequest {
    /// Checks the budget and normalizes the goal.
    pub fn validate(self) -> Result<(String, f64)> {
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(Error::BadRequest(
                "Budget must be a positive number".to_string(),
            ));
        }

        let goal = self
            .goal
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GOAL.to_string());

        Ok((goal, self.budget))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPlan {
    pub summary: String,
    pub social_posts: Vec<SocialPost>,
    pub ad_copy: Vec<AdCopy>,
    pub campaign_calendar: Vec<CalendarSlot>,
    pub insights: Vec<Insight>,
    pub product_analysis: ProductStats,
    pub sales_analysis: SalesStats,
}

/// Renders a plan. Output depends only on the arguments.
#[must_use]
pub fn compose(
    business: &Business,
    analytics: &BusinessAnalytics,
    goal: &str,
    budget: f64,
    today: NaiveDate,
    currency: &str,
) -> CampaignPlan {
    let products = &analytics.product_analysis;
    let sales = &analytics.sales_analysis;

    CampaignPlan {
        summary: copy::summary(goal, budget, analytics, currency),
        social_posts: copy::social_posts(business, products),
        ad_copy: copy::ad_copy(business, products, budget, currency),
        campaign_calendar: build_calendar(today),
        insights: copy::insights(products, sales, currency),
        product_analysis: products.clone(),
        sales_analysis: sales.clone(),
    }
}

/// Aggregates the business's data, composes a plan and stores it as a
/// campaign created by the scope's user.
pub fn create_campaign(
    store: &dyn Store,
    scope: &ScopedBusiness,
    request: CampaignRequest,
    currency: &str,
) -> Result<Campaign> {
    let (goal, budget) = request.validate()?;
    let analytics = analytics::analyze(store, scope)?;

    let now = Utc::now();
    let plan = compose(
        scope.business(),
        &analytics,
        &goal,
        budget,
        now.date_naive(),
        currency,
    );

    let campaign = Campaign {
        id: Uuid::new_v4().to_string(),
        business_id: scope.id().to_string(),
        goal,
        budget,
        payload: serde_json::to_value(&plan)?,
        created_by: Some(scope.user_id().to_string()),
        created_at: now,
    };
    store.create_campaign(&campaign)?;

    tracing::info!(
        business = %scope.business().slug,
        campaign = %campaign.id,
        budget,
        "campaign created"
    );

    Ok(campaign)
}
