use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};

use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::saledb::SaleExt,
    models::{
        salemodel::{CommissionPayout, Sale},
        usermodel::User,
    },
    service::error::ServiceError,
};

pub const RECENT_SALES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseBreakdown {
    #[serde(rename = "courseName")]
    pub course_name: String,
    pub sales: usize,
    pub revenue: BigDecimal,
    pub commission: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerAnalytics {
    #[serde(rename = "totalSales")]
    pub total_sales: usize,
    #[serde(rename = "totalRevenue")]
    pub total_revenue: BigDecimal,
    #[serde(rename = "totalCommission")]
    pub total_commission: BigDecimal,
    #[serde(rename = "pendingCommission")]
    pub pending_commission: BigDecimal,
    #[serde(rename = "clearedCommission")]
    pub cleared_commission: BigDecimal,
    #[serde(rename = "uniqueCourses")]
    pub unique_courses: usize,
    #[serde(rename = "uniqueStudents")]
    pub unique_students: usize,
    #[serde(rename = "courseBreakdown")]
    pub course_breakdown: Vec<CourseBreakdown>,
    #[serde(rename = "recentSales")]
    pub recent_sales: Vec<Sale>,
}

impl PartnerAnalytics {
    /// Reduces one partner's sales. The result depends only on the set of
    /// sales and payouts, never on their order.
    pub fn from_sales(sales: &[Sale], payouts: &[CommissionPayout]) -> Self {
        let paid: HashSet<Uuid> = payouts.iter().map(|p| p.sale_id).collect();

        let mut total_revenue = BigDecimal::zero();
        let mut total_commission = BigDecimal::zero();
        let mut cleared_commission = BigDecimal::zero();
        let mut students = BTreeSet::new();
        let mut courses: BTreeMap<&str, CourseBreakdown> = BTreeMap::new();

        for sale in sales {
            total_revenue += &sale.amount;
            total_commission += &sale.commission;
            if paid.contains(&sale.id) {
                cleared_commission += &sale.commission;
            }
            students.insert(sale.student_email.trim().to_lowercase());

            let entry = courses
                .entry(sale.course_name.as_str())
                .or_insert_with(|| CourseBreakdown {
                    course_name: sale.course_name.clone(),
                    sales: 0,
                    revenue: BigDecimal::zero(),
                    commission: BigDecimal::zero(),
                });
            entry.sales += 1;
            entry.revenue += &sale.amount;
            entry.commission += &sale.commission;
        }

        let unique_courses = courses.len();
        let mut course_breakdown: Vec<CourseBreakdown> = courses.into_values().collect();
        // Map order already breaks ties by name; the sort is stable.
        course_breakdown.sort_by(|a, b| b.sales.cmp(&a.sales));

        let mut recent_sales = sales.to_vec();
        recent_sales.sort_by(|a, b| {
            b.purchase_date
                .cmp(&a.purchase_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        recent_sales.truncate(RECENT_SALES);

        PartnerAnalytics {
            total_sales: sales.len(),
            pending_commission: &total_commission - &cleared_commission,
            total_revenue,
            total_commission,
            cleared_commission,
            unique_courses,
            unique_students: students.len(),
            course_breakdown,
            recent_sales,
        }
    }
}

pub struct AnalyticsService<S> {
    store: Arc<S>,
}

impl<S> AnalyticsService<S>
where
    S: SaleExt + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn for_partner(&self, partner: &User) -> Result<PartnerAnalytics, ServiceError> {
        let Some(code) = partner.partner_code() else {
            return Ok(PartnerAnalytics::from_sales(&[], &[]));
        };
        let sales = self.store.list_sales(code).await?;
        let payouts = self.store.list_payouts(code).await?;
        Ok(PartnerAnalytics::from_sales(&sales, &payouts))
    }
}
