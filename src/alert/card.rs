// src/alert/card.rs
//
// Adaptive Card payload as expected by the Teams / Power Automate flow, which
// reads attachments from `triggerBody().body`.

use crate::health::ResultSnapshot;
use serde::Serialize;

pub const CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
pub const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
pub const CARD_VERSION: &str = "1.3";

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub body: PayloadBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadBody {
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: &'static str,
    pub content: AdaptiveCard,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveCard {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: &'static str,
    pub body: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<&'static str>,
    pub text: String,
}

impl TextBlock {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "TextBlock",
            size: None,
            weight: None,
            text: text.into(),
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            size: Some("Medium"),
            weight: Some("Bolder"),
            ..Self::plain(text)
        }
    }
}

/// One name/message/status triplet per check, then an optional details link.
pub fn build_card(snapshot: &ResultSnapshot, details_url: Option<&str>) -> WebhookPayload {
    let mut body = Vec::with_capacity(snapshot.len() * 3 + 1);

    for (name, result) in snapshot.iter() {
        body.push(TextBlock::heading(name.as_str()));
        body.push(TextBlock::plain(result.message.as_str()));
        body.push(TextBlock::plain(format!("Status: {}", result.status_label())));
    }

    if let Some(url) = details_url {
        body.push(TextBlock::plain(format!("[View details]({url})")));
    }

    WebhookPayload {
        body: PayloadBody {
            attachments: vec![Attachment {
                content_type: CARD_CONTENT_TYPE,
                content: AdaptiveCard {
                    schema: CARD_SCHEMA,
                    kind: "AdaptiveCard",
                    version: CARD_VERSION,
                    body,
                },
            }],
        },
    }
}
