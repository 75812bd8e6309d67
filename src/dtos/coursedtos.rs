use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::{
        coursemodel::{Course, CourseId, Price},
        enrollmentmodel::{EnrolledCourse, ProgressUpdate},
        salemodel::Expiry,
    },
    service::{enrollment_view::ViewEntry, progress_hub::PlayerEvent, purchase::CheckoutRoute},
};

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct PriceQueryDto {
    #[validate(length(max = 64, message = "Referral code is too long"))]
    #[serde(rename = "ref")]
    pub referral: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CoursePriceDto {
    #[serde(rename = "courseId")]
    pub course_id: CourseId,
    pub title: String,
    #[serde(rename = "catalogPrice")]
    pub catalog_price: Price,
    pub price: Price,
    // Partner whose listing set the price, if any.
    #[serde(rename = "partnerCode")]
    pub partner_code: Option<String>,
    #[serde(rename = "planDays")]
    pub plan_days: i32,
    pub access: String,
}

impl CoursePriceDto {
    pub fn new(course: &Course, price: Price, partner_code: Option<String>) -> Self {
        let catalog_price = course.catalog_price();
        let partner_code = partner_code.filter(|_| price != catalog_price);
        let access = match Expiry::from_plan(Utc::now(), course.plan_days) {
            Ok(Expiry::Lifetime) => "Lifetime".to_string(),
            _ => format!("{} days", course.plan_days),
        };
        CoursePriceDto {
            course_id: course.id.clone(),
            title: course.title.clone(),
            catalog_price,
            price,
            partner_code,
            plan_days: course.plan_days,
            access,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoursePriceResponseDto {
    pub status: String,
    pub data: CoursePriceDto,
}

#[derive(Debug, Serialize)]
pub struct CourseListResponseDto {
    pub status: String,
    pub courses: Vec<CoursePriceDto>,
    pub results: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponseDto {
    pub status: String,
    pub data: CheckoutRoute,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentListResponseDto {
    pub status: String,
    pub enrollments: Vec<EnrolledCourse>,
    pub results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProgressUpdateDto {
    #[validate(range(min = 0.0, max = 100.0, message = "Progress must be between 0 and 100"))]
    pub progress: f64,

    #[validate(range(min = 0.0, message = "Watched duration cannot be negative"))]
    #[serde(rename = "watchedDuration")]
    pub watched_duration: f64,

    #[serde(rename = "lastAccessed")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl ProgressUpdateDto {
    pub fn into_update(self, course_id: CourseId, now: DateTime<Utc>) -> ProgressUpdate {
        ProgressUpdate {
            course_id,
            progress: self.progress,
            watched_duration: self.watched_duration,
            // A client clock ahead of ours must not pin lastAccessed in the future.
            last_accessed: self.last_accessed.map_or(now, |at| at.min(now)),
        }
    }
}

/// Player heartbeat, sent about once a second while a video is open.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HeartbeatDto {
    #[validate(range(min = 0.0, message = "Position cannot be negative"))]
    pub position: f64,

    #[validate(range(min = 0.0, message = "Duration cannot be negative"))]
    pub duration: f64,

    pub state: PlayerEvent,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponseDto {
    pub status: String,
    pub data: EnrolledCourse,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponseDto {
    pub status: String,
    pub data: ViewEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Duration;

    #[test]
    fn future_client_timestamps_are_capped() {
        let now = Utc::now();
        let dto = ProgressUpdateDto {
            progress: 40.0,
            watched_duration: 240.0,
            last_accessed: Some(now + Duration::hours(3)),
        };
        let update = dto.into_update(CourseId::new("5"), now);
        assert_eq!(update.last_accessed, now);
    }

    #[test]
    fn progress_out_of_range_is_rejected() {
        let dto: ProgressUpdateDto =
            serde_json::from_str(r#"{"progress": 140, "watchedDuration": 10}"#).unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn heartbeat_state_parses() {
        let dto: HeartbeatDto =
            serde_json::from_str(r#"{"position": 12.5, "duration": 600, "state": "closed"}"#)
                .unwrap();
        assert_eq!(dto.state, PlayerEvent::Closed);
    }

    #[test]
    fn price_dto_names_partner_only_when_it_changed_the_price() {
        let course = Course {
            id: CourseId::new("5"),
            title: "Full Stack Web Development".to_string(),
            price: BigDecimal::from(2999),
            reseller_price: None,
            plan_days: -1,
            video_url: None,
            youtube_id: None,
            created_at: Utc::now(),
        };
        let same = CoursePriceDto::new(&course, course.catalog_price(), Some("PARTNER123".into()));
        assert!(same.partner_code.is_none());
        assert_eq!(same.access, "Lifetime");

        let listed = CoursePriceDto::new(
            &course,
            Price::Paid(BigDecimal::from(3500)),
            Some("PARTNER123".into()),
        );
        assert_eq!(listed.partner_code.as_deref(), Some("PARTNER123"));

        let mut endless = course.clone();
        endless.plan_days = 200_000_000;
        let dto = CoursePriceDto::new(&endless, endless.catalog_price(), None);
        assert_eq!(dto.access, "200000000 days");
    }
}
