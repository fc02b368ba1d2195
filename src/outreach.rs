use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::models::AdvisorPersona;

const CALENDAR_BASE: &str = "https://calendar.google.com/calendar/render";
const CALENDAR_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachLinks {
    pub mailto: String,
    pub calendar: String,
}

// Percent-encodes a component, spaces as %20 rather than '+'
fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub fn mailto_link(advisor_name: &str) -> String {
    let subject = format!("Marketing Content for {}", advisor_name);
    let body = format!(
        "Hi {},\n\nI've generated some marketing content that might be helpful for your practice. Please review the attached content and let me know if you'd like to discuss further.\n\nBest regards",
        advisor_name
    );
    format!(
        "mailto:?subject={}&body={}",
        encode_component(&subject),
        encode_component(&body)
    )
}

/// Google Calendar template for a one-hour review starting a day after `now`.
pub fn calendar_link(advisor_name: &str, product_focus: &str, now: DateTime<Utc>) -> String {
    let start = now + Duration::days(1);
    let end = start + Duration::hours(1);
    let title = format!("Review Marketing Content with {}", advisor_name);
    let details = format!("Discuss generated marketing content for {}", product_focus);

    format!(
        "{}?action=TEMPLATE&text={}&dates={}/{}&details={}",
        CALENDAR_BASE,
        encode_component(&title),
        start.format(CALENDAR_FORMAT),
        end.format(CALENDAR_FORMAT),
        encode_component(&details)
    )
}

pub fn links_for(advisor: &AdvisorPersona, now: DateTime<Utc>) -> OutreachLinks {
    let focus = advisor.product_focus.as_deref().unwrap_or("your practice");
    OutreachLinks {
        mailto: mailto_link(&advisor.name),
        calendar: calendar_link(&advisor.name, focus, now),
    }
}
