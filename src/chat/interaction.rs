//! Chat-platform interaction payloads
//!
//! The inbound payload carries `{type, data: {name, options, custom_id,
//! values}, user|member.user}`; the outbound response carries `{type, data:
//! {content?, embeds?, components?, flags}}`. Command registration and
//! request signature verification happen outside this service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound interaction types
pub mod interaction_type {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
    pub const MESSAGE_COMPONENT: u8 = 3;
}

/// Outbound response types
pub mod response_type {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
}

/// Message flag: visible only to the invoking user
pub const EPHEMERAL: u64 = 64;

mod button_style {
    pub const PRIMARY: u8 = 1;
    pub const LINK: u8 = 5;
}

mod component_type {
    pub const ACTION_ROW: u8 = 1;
    pub const BUTTON: u8 = 2;
    pub const STRING_SELECT: u8 = 3;
}

/// Inbound interaction
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub member: Option<MemberRef>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub id: Option<String>,
    /// Command name for command invocations
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Control identifier for component interactions
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Selected values for select-menu interactions
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRef {
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl Interaction {
    /// Invoking chat identity, from `member.user` in guild channels or
    /// `user` in direct messages
    pub fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.as_str())
    }

    /// String value of a named command option
    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_str())
    }

    /// First selected value of a select-menu interaction
    pub fn selected_value(&self) -> Option<&str> {
        self.data.as_ref()?.values.first().map(String::as_str)
    }

    /// Channel the interaction came from
    pub fn channel(&self) -> &str {
        self.channel_id.as_deref().unwrap_or_default()
    }
}

/// Outbound interaction response
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: response_type::PONG,
            data: None,
        }
    }

    /// Ephemeral text message
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: response_type::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                content: Some(content.into()),
                flags: Some(EPHEMERAL),
                ..Default::default()
            }),
        }
    }

    pub fn with_components(mut self, rows: Vec<ActionRow>) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.components = rows;
        }
        self
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        if let Some(data) = self.data.as_mut() {
            data.embeds.push(embed);
        }
        self
    }
}

/// A row of interactive components
#[derive(Debug, Clone, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    components: Vec<Component>,
}

impl ActionRow {
    pub fn of(components: Vec<Component>) -> Self {
        Self {
            kind: component_type::ACTION_ROW,
            components,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Component {
    Button(Button),
    Select(StringSelect),
}

#[derive(Debug, Clone, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    style: u8,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
}

impl Button {
    /// Link button opening a wallet web page
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Component {
        Component::Button(Self {
            kind: component_type::BUTTON,
            style: button_style::LINK,
            label: label.into(),
            custom_id: None,
            url: Some(url.into()),
            disabled: false,
        })
    }

    /// Primary button dispatching back by control identifier
    pub fn primary(
        label: impl Into<String>,
        custom_id: impl Into<String>,
        disabled: bool,
    ) -> Component {
        Component::Button(Self {
            kind: component_type::BUTTON,
            style: button_style::PRIMARY,
            label: label.into(),
            custom_id: Some(custom_id.into()),
            url: None,
            disabled,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StringSelect {
    #[serde(rename = "type")]
    kind: u8,
    custom_id: String,
    options: Vec<SelectOption>,
}

impl StringSelect {
    pub fn of(custom_id: impl Into<String>, options: Vec<SelectOption>) -> Component {
        Component::Select(Self {
            kind: component_type::STRING_SELECT,
            custom_id: custom_id.into(),
            options,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Embed with titled field rows, used for history pages
#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_prefers_member() {
        let payload = serde_json::json!({
            "type": 2,
            "member": { "user": { "id": "guild-user" } },
            "user": { "id": "dm-user" }
        });
        let interaction: Interaction = serde_json::from_value(payload).unwrap();
        assert_eq!(interaction.user_id(), Some("guild-user"));
    }

    #[test]
    fn test_option_lookup() {
        let payload = serde_json::json!({
            "type": 2,
            "data": {
                "name": "send",
                "options": [
                    { "name": "amount", "value": "5" },
                    { "name": "to_address", "value": "0xabc" }
                ]
            },
            "user": { "id": "u1" }
        });
        let interaction: Interaction = serde_json::from_value(payload).unwrap();
        assert_eq!(interaction.option_str("amount"), Some("5"));
        assert_eq!(interaction.option_str("to_address"), Some("0xabc"));
        assert_eq!(interaction.option_str("missing"), None);
    }

    #[test]
    fn test_message_response_is_ephemeral() {
        let response = InteractionResponse::message("hello");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["flags"], 64);
        assert_eq!(json["data"]["content"], "hello");
    }

    #[test]
    fn test_link_button_serializes_without_custom_id() {
        let row = ActionRow::of(vec![Button::link("Send 💸", "http://localhost:3000/send/tok")]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], 1);
        assert_eq!(json["components"][0]["style"], 5);
        assert!(json["components"][0].get("custom_id").is_none());
        assert!(json["components"][0].get("disabled").is_none());
    }
}
