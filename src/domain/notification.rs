use serde::{Deserialize, Serialize};

/// Payload tag of the cross-context message sent when a push is delivered.
pub const NEW_PUSH: &str = "NEW_PUSH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Category tag ("mentions", "annonces", "systeme", "rencontre", ...).
    #[serde(rename = "type", default)]
    pub notification_type: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
}

impl NotificationItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, notification_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: None,
            notification_type: notification_type.into(),
            is_read: false,
            created_at: String::new(),
            deeplink: None,
        }
    }
}

/// One page of the notification list as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    #[serde(default)]
    pub items: Vec<NotificationItem>,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl NotificationPage {
    /// Splits the page into its unread items and the pagination metadata.
    pub fn into_unread(self) -> (Vec<NotificationItem>, PageInfo) {
        let info = PageInfo {
            unread_count: self.unread_count,
            has_more: self.has_more,
            next_cursor: self.next_cursor,
        };
        let unread = self.items.into_iter().filter(|item| !item.is_read).collect();
        (unread, info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub unread_count: u64,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushSignal {
    NewPush,
}

#[derive(Deserialize)]
struct PushEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl PushSignal {
    /// Returns `None` for anything that is not a JSON object tagged `NEW_PUSH`.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let envelope: PushEnvelope = serde_json::from_slice(payload).ok()?;
        match envelope.kind.as_deref() {
            Some(NEW_PUSH) => Some(PushSignal::NewPush),
            _ => None,
        }
    }
}
