use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Days covered by a campaign calendar.
pub const HORIZON_DAYS: u64 = 28;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub week: u32,
    pub date: NaiveDate,
    pub weekday: String,
    pub content_type: String,
    pub platform: String,
    pub time: String,
}

struct SlotTemplate {
    content_type: &'static str,
    platform: &'static str,
    time: &'static str,
}

fn template_for(weekday: Weekday) -> Option<SlotTemplate> {
    let template = match weekday {
        Weekday::Mon => SlotTemplate {
            content_type: "Product Showcase",
            platform: "Instagram, Facebook",
            time: "10:00 AM",
        },
        Weekday::Wed => SlotTemplate {
            content_type: "Customer Engagement",
            platform: "WhatsApp, Instagram Stories",
            time: "2:00 PM",
        },
        Weekday::Fri => SlotTemplate {
            content_type: "Special Offer",
            platform: "All Channels",
            time: "12:00 PM",
        },
        Weekday::Sat => SlotTemplate {
            content_type: "Weekend Teaser",
            platform: "WhatsApp Broadcast, SMS",
            time: "9:00 AM",
        },
        Weekday::Tue | Weekday::Thu | Weekday::Sun => return None,
    };
    Some(template)
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Lays out posting slots over the four weeks starting at `start`.
/// Week numbers count from the start date, not from calendar weeks.
#[must_use]
pub fn build_calendar(start: NaiveDate) -> Vec<CalendarSlot> {
    (0..HORIZON_DAYS)
        .filter_map(|offset| {
            let date = start.checked_add_days(Days::new(offset))?;
            let weekday = date.weekday();
            let template = template_for(weekday)?;
            Some(CalendarSlot {
                week: (offset / 7) as u32 + 1,
                date,
                weekday: weekday_name(weekday).to_string(),
                content_type: template.content_type.to_string(),
                platform: template.platform.to_string(),
                time: template.time.to_string(),
            })
        })
        .collect()
}
