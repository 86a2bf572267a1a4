use crate::models::user::{SubscriptionTier, User};
use crate::utils::time::format_date;
use chrono::{DateTime, Utc};

pub const NOT_PURCHASED: &str = "Not purchased";
pub const FOREVER: &str = "Forever";
pub const EXPIRED: &str = "Expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub text: &'static str,
    pub class: &'static str,
}

/// Text shown next to "Subscription until"
pub fn subscription_label(user: &User, now: DateTime<Utc>) -> String {
    if !user.subscription.is_paid() {
        return NOT_PURCHASED.to_string();
    }

    match (user.subscription_end(), user.subscription_end_date.as_deref()) {
        (Some(end), _) if end > now => format_date(end),
        (Some(_), _) => EXPIRED.to_string(),
        // Unparsable dates are shown as sent
        (None, Some(raw)) if !raw.trim().is_empty() => raw.to_string(),
        (None, _) => FOREVER.to_string(),
    }
}

pub fn subscription_badge(tier: SubscriptionTier) -> Badge {
    match tier {
        SubscriptionTier::Alpha => Badge {
            text: "Alpha",
            class: "badge-alpha",
        },
        SubscriptionTier::Premium => Badge {
            text: "Premium",
            class: "badge-premium",
        },
        SubscriptionTier::Free => Badge {
            text: "Free",
            class: "badge-free",
        },
    }
}
