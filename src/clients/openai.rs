//! OpenAI-compatible chat-completions client plus the prompt templates for
//! turning meeting transcripts into posts, emails, and summaries.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::clients::ClientError;
use crate::config::OpenAiConfig;

const SOCIAL_SYSTEM_PROMPT: &str = "You are a professional social media content creator \
    who specializes in creating engaging posts from meeting transcripts.";
const EMAIL_SYSTEM_PROMPT: &str = "You are a professional assistant who creates clear, \
    concise follow-up emails from meeting transcripts.";
const SUMMARY_SYSTEM_PROMPT: &str = "You are a professional meeting assistant who creates \
    clear, concise summaries.";
const INSIGHTS_SYSTEM_PROMPT: &str =
    "You are a professional meeting analyst who extracts key insights.";

/// A generated social post split into its parts.
#[derive(Debug, Clone, Serialize)]
pub struct SocialPost {
    pub content: String,
    pub hashtags: String,
    pub disclaimer: String,
    pub platform: String,
}

pub struct ContentGenerator {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Validate the base URL for security.
/// - HTTPS is required for remote URLs to protect API keys in transit
/// - HTTP is allowed only for localhost (local LLM servers)
fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| format!("Invalid base_url '{}': {}", base_url, e))?;

    let scheme = parsed.scheme();
    let host = parsed.host_str().unwrap_or("");

    match scheme {
        "https" => Ok(()),
        "http" => {
            let is_localhost =
                host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1";
            if is_localhost {
                warn!(
                    "Using unencrypted HTTP for local LLM server at '{}'. \
                     API key will be transmitted in cleartext.",
                    base_url
                );
                Ok(())
            } else {
                Err(format!(
                    "HTTP is not allowed for remote URLs (base_url: '{}'). \
                     Use HTTPS to protect your API key in transit.",
                    base_url
                ))
            }
        }
        _ => Err(format!(
            "Unsupported URL scheme '{}' in base_url '{}'. Only http and https are allowed.",
            scheme, base_url
        )),
    }
}

impl ContentGenerator {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        validate_base_url(&config.base_url).map_err(|e| anyhow::anyhow!(e))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, ClientError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model, url = %url, "calling LLM API");

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("LLM request failed: {}", e);
                ClientError::network(&e)
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(status = %status, "LLM API error: {}", text);
            return Err(ClientError::from_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::other(format!("malformed completion response: {}", e)))?;
        let content = data["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| ClientError::other("no choices in response"))?;
        debug!(chars = content.len(), "LLM response received");
        Ok(content.trim().to_string())
    }

    /// Plain social-post text for a platform, without structure parsing.
    pub async fn social_content(
        &self,
        transcript: &str,
        title: &str,
        platform: &str,
    ) -> Result<String, ClientError> {
        let prompt = if platform == "linkedin" {
            format!(
                "Based on the following meeting transcript, create a professional LinkedIn post that:\n\
                 1. Highlights key insights or outcomes from the meeting\n\
                 2. Is engaging and valuable to the professional network\n\
                 3. Uses appropriate hashtags\n\
                 4. Maintains a professional tone\n\n\
                 Meeting Title: {}\nTranscript: {}\n\nGenerate a LinkedIn post:",
                title, transcript
            )
        } else {
            format!(
                "Based on the following meeting transcript, create a social media post that:\n\
                 1. Highlights key insights or outcomes\n\
                 2. Is engaging and professional\n\
                 3. Is appropriate for {platform}\n\
                 4. Uses relevant hashtags\n\n\
                 Meeting Title: {}\nTranscript: {}\n\nGenerate a {platform} post:",
                title, transcript
            )
        };
        self.chat(SOCIAL_SYSTEM_PROMPT, &prompt, 500, 0.7).await
    }

    /// Platform-targeted post with hashtags split out. `custom_prompt`
    /// replaces the built-in template when supplied (the per-platform prompt
    /// templates from user settings arrive this way).
    pub async fn social_post(
        &self,
        transcript: &str,
        title: &str,
        platform: &str,
        custom_prompt: Option<&str>,
    ) -> Result<SocialPost, ClientError> {
        let prompt = build_social_prompt(transcript, title, platform, custom_prompt);
        let content = self.chat(SOCIAL_SYSTEM_PROMPT, &prompt, 600, 0.7).await?;
        Ok(split_post_content(&content, platform))
    }

    pub async fn follow_up_email(
        &self,
        transcript: &str,
        title: &str,
        attendees: &[String],
    ) -> Result<String, ClientError> {
        let attendees_line = if attendees.is_empty() {
            String::new()
        } else {
            format!("Attendees: {}\n", attendees.join(", "))
        };
        let prompt = format!(
            "Based on the following meeting transcript, create a professional follow-up email that:\n\
             1. Summarizes what was discussed in the meeting\n\
             2. Highlights key decisions and action items\n\
             3. Thanks participants for their time\n\
             4. Suggests next steps or follow-up actions\n\
             5. Is professional and concise (2-3 paragraphs)\n\n\
             Meeting Title: {}\n{}Transcript: {}\n\nGenerate a follow-up email:",
            title, attendees_line, transcript
        );
        self.chat(EMAIL_SYSTEM_PROMPT, &prompt, 500, 0.3).await
    }

    pub async fn meeting_summary(&self, transcript: &str) -> Result<String, ClientError> {
        let prompt = format!(
            "Please provide a concise summary of the following meeting transcript:\n\n{}\n\n\
             The summary should:\n\
             1. Highlight the main topics discussed\n\
             2. Note any key decisions or action items\n\
             3. Be 2-3 paragraphs long\n\
             4. Be professional and clear",
            transcript
        );
        self.chat(SUMMARY_SYSTEM_PROMPT, &prompt, 300, 0.3).await
    }

    pub async fn key_insights(&self, transcript: &str) -> Result<Vec<String>, ClientError> {
        let prompt = format!(
            "Extract 3-5 key insights or takeaways from this meeting transcript:\n\n{}\n\n\
             Return them as a bulleted list, each insight being 1-2 sentences.",
            transcript
        );
        let content = self.chat(INSIGHTS_SYSTEM_PROMPT, &prompt, 400, 0.3).await?;
        Ok(parse_bullets(&content))
    }
}

fn build_social_prompt(
    transcript: &str,
    title: &str,
    platform: &str,
    custom_prompt: Option<&str>,
) -> String {
    if let Some(custom) = custom_prompt {
        return format!(
            "{}\n\nMeeting Title: {}\nTranscript: {}",
            custom, title, transcript
        );
    }
    match platform {
        "linkedin" => format!(
            "Based on the following meeting transcript, create a LinkedIn post that:\n\
             1. Draft a LinkedIn post (120-180 words) that summarizes the meeting value in first person.\n\
             2. Use a warm, conversational tone consistent with an experienced financial advisor.\n\
             3. End with up to three hashtags.\n\
             Return only the post text.\n\n\
             Meeting Title: {}\nTranscript: {}",
            title, transcript
        ),
        "facebook" => format!(
            "Based on the following meeting transcript, create a Facebook post that:\n\
             1. Write a Facebook post (100-150 words) that summarizes the meeting value in first person.\n\
             2. Use a friendly, conversational tone that's engaging for Facebook.\n\
             3. Include 2-3 relevant hashtags at the end.\n\
             4. Make it shareable and engaging for Facebook audience.\n\
             Return only the post text.\n\n\
             Meeting Title: {}\nTranscript: {}",
            title, transcript
        ),
        other => format!(
            "Based on the following meeting transcript, create a {other} post that:\n\
             1. Highlights key insights in a personal, engaging way\n\
             2. Is appropriate for {other} character limits\n\
             3. Includes relevant hashtags\n\
             4. Maintains an appropriate tone for {other}\n\n\
             Meeting Title: {}\nTranscript: {}\n\n\
             Return the response in this exact format:\n\
             POST: [the main post content]\n\
             HASHTAGS: [hashtags separated by spaces]\n\
             DISCLAIMER: [if applicable]",
            title, transcript
        ),
    }
}

/// Split model output into post text and hashtags. LinkedIn/Facebook posts
/// come back free-form with hashtag lines at the end; other platforms use
/// the structured POST/HASHTAGS/DISCLAIMER format.
fn split_post_content(content: &str, platform: &str) -> SocialPost {
    if platform == "linkedin" || platform == "facebook" {
        let mut post = String::new();
        let mut hashtags = String::new();
        for line in content.lines() {
            if line.trim().starts_with('#') {
                if !hashtags.is_empty() {
                    hashtags.push(' ');
                }
                hashtags.push_str(line.trim());
            } else {
                post.push_str(line);
                post.push('\n');
            }
        }
        SocialPost {
            content: post.trim().to_string(),
            hashtags,
            disclaimer: String::new(),
            platform: platform.to_string(),
        }
    } else {
        let mut post = String::new();
        let mut hashtags = String::new();
        let mut disclaimer = String::new();
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("POST:") {
                post = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("HASHTAGS:") {
                hashtags = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("DISCLAIMER:") {
                disclaimer = rest.trim().to_string();
            }
        }
        SocialPost {
            content: post,
            hashtags,
            disclaimer,
            platform: platform.to_string(),
        }
    }
}

fn parse_bullets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-') || line.starts_with('•') || line.starts_with('*'))
        .map(|line| {
            line.trim_start_matches(['-', '•', '*'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
