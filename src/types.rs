use serde::{Deserialize, Serialize};

/// Hosts recognized as video-meeting links when scanning event text.
pub(crate) const MEETING_URL_HOSTS: &[&str] = &[
    "zoom.us",
    "zoom.com",
    "teams.microsoft.com",
    "teams.live.com",
    "meet.google.com",
    "webex.com",
];

/// Video-conferencing platform detected from a meeting URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingPlatform {
    Zoom,
    Teams,
    GoogleMeet,
    Webex,
    Unknown,
}

impl MeetingPlatform {
    pub fn from_url(url: &str) -> Self {
        let url = url.to_ascii_lowercase();
        if url.contains("zoom.us") || url.contains("zoom.com") {
            Self::Zoom
        } else if url.contains("teams.microsoft.com") || url.contains("teams.live.com") {
            Self::Teams
        } else if url.contains("meet.google.com") {
            Self::GoogleMeet
        } else if url.contains("webex.com") {
            Self::Webex
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zoom => "zoom",
            Self::Teams => "teams",
            Self::GoogleMeet => "google_meet",
            Self::Webex => "webex",
            Self::Unknown => "unknown",
        }
    }
}

/// Social platform content can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Linkedin,
    Facebook,
}

impl SocialPlatform {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "linkedin" => Some(Self::Linkedin),
            "facebook" => Some(Self::Facebook),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Facebook => "facebook",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_url() {
        assert_eq!(
            MeetingPlatform::from_url("https://zoom.us/j/123456"),
            MeetingPlatform::Zoom
        );
        assert_eq!(
            MeetingPlatform::from_url("https://teams.microsoft.com/l/meetup-join/abc"),
            MeetingPlatform::Teams
        );
        assert_eq!(
            MeetingPlatform::from_url("https://meet.google.com/abc-defg-hij"),
            MeetingPlatform::GoogleMeet
        );
        assert_eq!(
            MeetingPlatform::from_url("https://company.webex.com/meet/room"),
            MeetingPlatform::Webex
        );
        assert_eq!(
            MeetingPlatform::from_url("https://example.com/call"),
            MeetingPlatform::Unknown
        );
    }

    #[test]
    fn test_platform_from_url_is_case_insensitive() {
        assert_eq!(
            MeetingPlatform::from_url("https://ZOOM.US/j/99"),
            MeetingPlatform::Zoom
        );
    }

    #[test]
    fn test_social_platform_parse() {
        assert_eq!(SocialPlatform::parse("linkedin"), Some(SocialPlatform::Linkedin));
        assert_eq!(SocialPlatform::parse("facebook"), Some(SocialPlatform::Facebook));
        assert_eq!(SocialPlatform::parse("myspace"), None);
    }
}
