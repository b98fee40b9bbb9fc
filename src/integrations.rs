//! Optional integrations, resolved once at startup.
//!
//! Each external service is either constructed here or absent for the whole
//! process lifetime; handlers check the capability and answer 503 when it
//! is missing, rather than probing per call.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::google::GoogleCalendarClient;
use crate::clients::openai::ContentGenerator;
use crate::clients::recall::RecallClient;
use crate::clients::social::SocialClient;
use crate::config::AppConfig;

pub struct Integrations {
    pub google: Option<Arc<GoogleCalendarClient>>,
    pub recall: Option<Arc<RecallClient>>,
    pub content: Option<Arc<ContentGenerator>>,
    pub social: Option<Arc<SocialClient>>,
}

impl Integrations {
    pub fn from_config(config: &AppConfig) -> Self {
        let google = match &config.google {
            Some(cfg) => match GoogleCalendarClient::new(cfg) {
                Ok(client) => {
                    info!("Google Calendar integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "Google Calendar integration unavailable");
                    None
                }
            },
            None => {
                warn!("Google Calendar not configured (GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET)");
                None
            }
        };

        let recall = match &config.recall {
            Some(cfg) => match RecallClient::new(cfg) {
                Ok(client) => {
                    info!("Recall integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "Recall integration unavailable");
                    None
                }
            },
            None => {
                warn!("Recall not configured (RECALL_API_KEY)");
                None
            }
        };

        let content = match &config.openai {
            Some(cfg) => match ContentGenerator::new(cfg) {
                Ok(client) => {
                    info!(model = %cfg.model, "AI content generation enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "AI content generation unavailable");
                    None
                }
            },
            None => {
                warn!("AI content generation not configured (OPENAI_API_KEY)");
                None
            }
        };

        let social = if config.linkedin.is_some() || config.facebook.is_some() {
            match SocialClient::new(
                config.linkedin.clone(),
                config.facebook.clone(),
                config.server.public_base_url.clone(),
            ) {
                Ok(client) => {
                    info!(
                        linkedin = config.linkedin.is_some(),
                        facebook = config.facebook.is_some(),
                        "social publishing enabled"
                    );
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "social publishing unavailable");
                    None
                }
            }
        } else {
            warn!("social publishing not configured (LINKEDIN_*/FACEBOOK_*)");
            None
        };

        Self {
            google,
            recall,
            content,
            social,
        }
    }
}
