//! LinkedIn and Facebook OAuth + publishing client.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::clients::{build_query, urlencoded, ClientError, REQUEST_TIMEOUT};
use crate::config::{FacebookConfig, LinkedinConfig};
use crate::types::SocialPlatform;

const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const LINKEDIN_USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
const LINKEDIN_PROFILE_URL: &str = "https://api.linkedin.com/v2/people/~";
const LINKEDIN_POSTS_URL: &str = "https://api.linkedin.com/v2/ugcPosts";

const FACEBOOK_AUTH_URL: &str = "https://www.facebook.com/v22.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v22.0/oauth/access_token";
const FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com/v22.0";

#[derive(Debug, Clone)]
pub struct SocialTokens {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Result of a publish attempt. `share_url` is set when Facebook refuses
/// direct posting and we fall back to a share-dialog link.
#[derive(Debug, Clone)]
pub struct PostOutcome {
    pub post_id: String,
    pub message: String,
    pub share_url: Option<String>,
    pub user_name: Option<String>,
    pub note: Option<String>,
}

pub struct SocialClient {
    http: Client,
    linkedin: Option<LinkedinConfig>,
    facebook: Option<FacebookConfig>,
    public_base_url: String,
}

impl SocialClient {
    pub fn new(
        linkedin: Option<LinkedinConfig>,
        facebook: Option<FacebookConfig>,
        public_base_url: String,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            linkedin,
            facebook,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn callback_url(&self, platform: SocialPlatform) -> String {
        format!("{}/auth/{}/callback", self.public_base_url, platform.as_str())
    }

    fn linkedin_config(&self) -> Result<&LinkedinConfig, ClientError> {
        self.linkedin
            .as_ref()
            .ok_or_else(|| ClientError::other("LinkedIn integration is not configured"))
    }

    fn facebook_config(&self) -> Result<&FacebookConfig, ClientError> {
        self.facebook
            .as_ref()
            .ok_or_else(|| ClientError::other("Facebook integration is not configured"))
    }

    pub fn auth_url(&self, platform: SocialPlatform, state: &str) -> Result<String, ClientError> {
        let callback = self.callback_url(platform);
        match platform {
            SocialPlatform::Linkedin => {
                let config = self.linkedin_config()?;
                Ok(format!(
                    "{}?{}",
                    LINKEDIN_AUTH_URL,
                    build_query(&[
                        ("response_type", "code"),
                        ("client_id", &config.client_id),
                        ("redirect_uri", &callback),
                        ("state", state),
                        ("scope", "w_member_social,openid,profile,email"),
                    ])
                ))
            }
            SocialPlatform::Facebook => {
                let config = self.facebook_config()?;
                Ok(format!(
                    "{}?{}",
                    FACEBOOK_AUTH_URL,
                    build_query(&[
                        ("client_id", &config.app_id),
                        ("redirect_uri", &callback),
                        ("scope", "public_profile,pages_show_list"),
                        ("response_type", "code"),
                        ("state", state),
                    ])
                ))
            }
        }
    }

    pub async fn exchange_code(
        &self,
        platform: SocialPlatform,
        code: &str,
    ) -> Result<SocialTokens, ClientError> {
        let callback = self.callback_url(platform);
        let resp = match platform {
            SocialPlatform::Linkedin => {
                let config = self.linkedin_config()?;
                self.http
                    .post(LINKEDIN_TOKEN_URL)
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("client_id", &config.client_id),
                        ("client_secret", &config.client_secret),
                        ("redirect_uri", &callback),
                    ])
                    .send()
                    .await
            }
            SocialPlatform::Facebook => {
                let config = self.facebook_config()?;
                self.http
                    .get(FACEBOOK_TOKEN_URL)
                    .query(&[
                        ("client_id", config.app_id.as_str()),
                        ("client_secret", config.app_secret.as_str()),
                        ("redirect_uri", callback.as_str()),
                        ("code", code),
                    ])
                    .send()
                    .await
            }
        }
        .map_err(|e| ClientError::network(&e))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed token response: {}", e)))?;
        let access_token = data["access_token"]
            .as_str()
            .ok_or_else(|| ClientError::other("no access_token in response"))?
            .to_string();
        info!(platform = platform.as_str(), "exchanged authorization code");
        Ok(SocialTokens {
            access_token,
            expires_in: data["expires_in"].as_u64(),
        })
    }

    pub async fn post(
        &self,
        platform: SocialPlatform,
        access_token: &str,
        content: &str,
    ) -> Result<PostOutcome, ClientError> {
        match platform {
            SocialPlatform::Linkedin => self.post_to_linkedin(access_token, content).await,
            SocialPlatform::Facebook => self.post_to_facebook(access_token, content).await,
        }
    }

    async fn post_to_linkedin(
        &self,
        access_token: &str,
        content: &str,
    ) -> Result<PostOutcome, ClientError> {
        let author = self.linkedin_author_urn(access_token).await?;

        let payload = json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": {"text": content},
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let resp = self
            .http
            .post(LINKEDIN_POSTS_URL)
            .bearer_auth(access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.as_u16() != 201 {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed post response: {}", e)))?;
        let post_id = data["id"].as_str().unwrap_or_default().to_string();
        info!(post_id = %post_id, "posted to LinkedIn");
        Ok(PostOutcome {
            post_id,
            message: "Successfully posted to linkedin".to_string(),
            share_url: None,
            user_name: None,
            note: None,
        })
    }

    /// Resolve the member URN for the post author. The OpenID userinfo
    /// endpoint is tried first; older tokens only work against the legacy
    /// profile endpoint.
    async fn linkedin_author_urn(&self, access_token: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .get(LINKEDIN_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;

        if resp.status().is_success() {
            let data: Value = resp
                .json()
                .await
                .map_err(|e| ClientError::other(format!("malformed userinfo response: {}", e)))?;
            let sub = data["sub"].as_str().unwrap_or_default();
            let id = sub.rsplit('/').next().unwrap_or(sub);
            return Ok(format!("urn:li:person:{}", id));
        }

        let resp = self
            .http
            .get(LINKEDIN_PROFILE_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed profile response: {}", e)))?;
        let id = data["id"]
            .as_str()
            .ok_or_else(|| ClientError::other("LinkedIn profile response missing id"))?;
        Ok(format!("urn:li:person:{}", id))
    }

    async fn post_to_facebook(
        &self,
        access_token: &str,
        content: &str,
    ) -> Result<PostOutcome, ClientError> {
        let resp = self
            .http
            .get(format!("{}/me", FACEBOOK_GRAPH_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), &text));
        }
        let user: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed user response: {}", e)))?;
        let user_id = user["id"]
            .as_str()
            .ok_or_else(|| ClientError::other("Facebook user response missing id"))?;
        let user_name = user["name"].as_str().unwrap_or("User").to_string();

        let resp = self
            .http
            .post(format!("{}/{}/feed", FACEBOOK_GRAPH_URL, user_id))
            .bearer_auth(access_token)
            .json(&json!({"message": content}))
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if status.is_success() {
            let data: Value = serde_json::from_str(&text)
                .map_err(|e| ClientError::other(format!("malformed post response: {}", e)))?;
            let post_id = data["id"].as_str().unwrap_or_default().to_string();
            info!(post_id = %post_id, "posted to Facebook");
            return Ok(PostOutcome {
                post_id,
                message: format!("Successfully posted to Facebook as {}", user_name),
                share_url: None,
                user_name: Some(user_name),
                note: None,
            });
        }

        let error_message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| text.clone());

        if is_permission_error(&error_message) {
            warn!(
                error = %error_message,
                "direct Facebook posting refused, falling back to share URL"
            );
            return Ok(share_fallback(content, &user_name));
        }

        Err(ClientError::from_status(status.as_u16(), &error_message))
    }
}

/// Errors that mean the token lacks publishing permission rather than the
/// request being otherwise broken.
fn is_permission_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["permission", "scope", "publish_to_groups", "pages_manage_posts", "requires app being installed"]
        .iter()
        .any(|marker| lower.contains(marker))
}

fn share_fallback(content: &str, user_name: &str) -> PostOutcome {
    let share_url = format!(
        "https://www.facebook.com/sharer/sharer.php?u=&quote={}",
        urlencoded(content)
    );
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    PostOutcome {
        post_id: format!("share_url_{}", hasher.finish() % 10000),
        message: "Facebook share URL generated (direct posting requires additional permissions)"
            .to_string(),
        share_url: Some(share_url),
        user_name: Some(user_name.to_string()),
        note: Some(
            "Direct feed publishing requires app review with pages_manage_posts; the share \
             dialog lets the user post the content manually."
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SocialClient {
        SocialClient::new(
            Some(LinkedinConfig {
                client_id: "li-id".into(),
                client_secret: "li-secret".into(),
            }),
            Some(FacebookConfig {
                app_id: "fb-id".into(),
                app_secret: "fb-secret".into(),
            }),
            "http://localhost:8000".into(),
        )
        .unwrap()
    }

    #[test]
    fn test_linkedin_auth_url() {
        let url = client().auth_url(SocialPlatform::Linkedin, "s1").unwrap();
        assert!(url.starts_with(LINKEDIN_AUTH_URL));
        assert!(url.contains("client_id=li-id"));
        assert!(url.contains("w_member_social"));
        assert!(url.contains("auth%2Flinkedin%2Fcallback"));
    }

    #[test]
    fn test_facebook_auth_url() {
        let url = client().auth_url(SocialPlatform::Facebook, "s2").unwrap();
        assert!(url.starts_with(FACEBOOK_AUTH_URL));
        assert!(url.contains("client_id=fb-id"));
        assert!(url.contains("public_profile"));
    }

    #[test]
    fn test_unconfigured_platform_rejected() {
        let client = SocialClient::new(None, None, "http://localhost:8000".into()).unwrap();
        assert!(client.auth_url(SocialPlatform::Linkedin, "s").is_err());
        assert!(client.auth_url(SocialPlatform::Facebook, "s").is_err());
    }

    #[test]
    fn test_permission_error_detection() {
        assert!(is_permission_error("(#200) Requires pages_manage_posts permission"));
        assert!(is_permission_error("Missing scope publish_to_groups"));
        assert!(!is_permission_error("Invalid OAuth access token"));
    }

    #[test]
    fn test_share_fallback_encodes_content() {
        let outcome = share_fallback("hello world & more", "Ada");
        let share_url = outcome.share_url.unwrap();
        assert!(share_url.contains("quote=hello%20world%20%26%20more"));
        assert!(outcome.post_id.starts_with("share_url_"));
        assert_eq!(outcome.user_name.as_deref(), Some("Ada"));
    }
}
