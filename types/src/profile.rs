use serde::{Deserialize, Serialize};

/// Text-to-speech preferences for transfer announcements. Stored and
/// forwarded verbatim; speech itself happens in the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_rate")]
    pub pitch: f32,
    /// Template for announcing an outgoing transfer, e.g.
    /// "Sent {amount} {currency}".
    #[serde(rename = "sentTemplate", default, skip_serializing_if = "Option::is_none")]
    pub sent_template: Option<String>,
    /// Template for announcing an incoming transfer.
    #[serde(
        rename = "receivedTemplate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub received_template: Option<String>,
}

fn default_lang() -> String {
    "vi-VN".to_string()
}

fn default_rate() -> f32 {
    1.0
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            lang: default_lang(),
            rate: 1.0,
            pitch: 1.0,
            sent_template: None,
            received_template: None,
        }
    }
}

/// Credential handed over by the identity provider, already validated.
/// The core performs no authentication of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: crate::PlayerId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Per-user profile persisted under `users/{userId}`, read once at
/// join/bootstrap time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "avatarURL", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(
        rename = "voiceSettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub voice_settings: Option<VoiceSettings>,
}

impl UserProfile {
    /// Name to use for the player's room record, falling back to the
    /// identity provider's display name or email.
    pub fn player_name(&self, display_name: Option<&str>, email: Option<&str>) -> String {
        self.name
            .clone()
            .or_else(|| display_name.map(str::to_string))
            .or_else(|| email.map(str::to_string))
            .unwrap_or_default()
    }

    pub fn player_avatar(&self) -> String {
        self.avatar_url.clone().unwrap_or_default()
    }
}
