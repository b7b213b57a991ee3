// src/services/discord.rs

//! Discord webhook channel.
//!
//! A batch becomes one webhook execution with one embed per posting.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::MAX_EMBEDS_PER_MESSAGE;
use crate::pipeline::{Batch, EventKind, ReportableEvent};
use crate::utils::http::body_excerpt;

use super::Channel;

const EMBED_COLOR: u32 = 0x03b2f8;
const FIELD_VALUE_LIMIT: usize = 1024;
const DESCRIPTION_LIMIT: usize = 4096;
/// Combined embed text allowed in one message.
const MESSAGE_TEXT_LIMIT: usize = 6000;

#[derive(Debug, Serialize, PartialEq)]
struct WebhookMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Embed {
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter>,
}

#[derive(Debug, Serialize, PartialEq)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct EmbedFooter {
    text: String,
}

/// Cut `text` to at most `limit` characters, marking the cut with `…`.
fn truncate(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text;
    }
    if limit == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(limit - 1).collect();
    cut.push('…');
    cut
}

impl EmbedField {
    fn new(name: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            value: truncate(value, FIELD_VALUE_LIMIT),
            inline: false,
        }
    }
}

impl Embed {
    /// Characters Discord counts against the per-message total.
    fn text_len(&self) -> usize {
        self.description.chars().count()
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
            + self.footer.as_ref().map_or(0, |f| f.text.chars().count())
    }

    /// Shrink field values, then the description, to fit `budget` characters.
    fn fit(&mut self, budget: usize) {
        let field_cap = budget / (2 * self.fields.len().max(1));
        for field in &mut self.fields {
            field.value = truncate(std::mem::take(&mut field.value), field_cap);
        }
        let rest = self.text_len() - self.description.chars().count();
        self.description = truncate(
            std::mem::take(&mut self.description),
            budget.saturating_sub(rest),
        );
    }
}

fn render_embed(event: &ReportableEvent) -> Embed {
    let posting = &event.posting;
    Embed {
        description: truncate(
            format!(
                "# [{} @ {}]({})",
                posting.title, posting.company_name, posting.url
            ),
            DESCRIPTION_LIMIT,
        ),
        color: EMBED_COLOR,
        fields: vec![
            EmbedField::new("**Location(s)**", posting.location_summary()),
            EmbedField::new("**Sponsorship**", posting.sponsorship_summary()),
        ],
        timestamp: posting.posted_at().map(|t| t.to_rfc3339()),
        footer: match event.kind {
            EventKind::New => None,
            EventKind::Reactivated => Some(EmbedFooter {
                text: "Reopened posting".to_string(),
            }),
        },
    }
}

fn render_message(batch: &Batch) -> WebhookMessage {
    let mut embeds: Vec<Embed> = batch.iter().map(render_embed).collect();
    let total: usize = embeds.iter().map(Embed::text_len).sum();
    if total > MESSAGE_TEXT_LIMIT {
        let budget = MESSAGE_TEXT_LIMIT / embeds.len();
        for embed in &mut embeds {
            embed.fit(budget);
        }
    }
    WebhookMessage { embeds }
}

/// A single Discord webhook endpoint.
pub struct DiscordWebhook {
    client: Client,
    url: Url,
    name: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: &str, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
            name: name.into(),
        })
    }

    /// Build one channel per URL, named after the webhook id.
    ///
    /// The name never includes the webhook token.
    pub fn from_urls(client: &Client, urls: &[String]) -> Result<Vec<Self>> {
        urls.iter()
            .enumerate()
            .map(|(i, raw)| -> Result<Self> {
                let url = Url::parse(raw)?;
                let name = webhook_id(&url)
                    .map(|id| format!("discord:{}", id))
                    .unwrap_or_else(|| format!("discord#{}", i + 1));
                Ok(Self {
                    client: client.clone(),
                    url,
                    name,
                })
            })
            .collect()
    }
}

/// Extract `{id}` from `.../webhooks/{id}/{token}`.
fn webhook_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|s| *s == "webhooks")?;
    segments
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Channel for DiscordWebhook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, batch: &Batch) -> Result<()> {
        if batch.len() > MAX_EMBEDS_PER_MESSAGE {
            return Err(AppError::delivery(
                &self.name,
                format!(
                    "batch of {} exceeds {} embeds per message",
                    batch.len(),
                    MAX_EMBEDS_PER_MESSAGE
                ),
            ));
        }

        let message = render_message(batch);
        let response = self
            .client
            .post(self.url.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| AppError::delivery(&self.name, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(
                &self.name,
                format!("{}: {}", status, body_excerpt(&body, 200)),
            ));
        }
        Ok(())
    }
}
