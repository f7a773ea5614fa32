use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::actions::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// The four primitives the conversation flow needs from any chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> anyhow::Result<()>;

    async fn send_photo(&self, chat_id: &str, path: &Path, caption: &str) -> anyhow::Result<()>;

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> anyhow::Result<()>;

    async fn fetch_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>>;
}

/// Stands in when no bot token is configured: outbound traffic is logged and
/// dropped, inbound file fetches fail.
pub struct NoopTransport;

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        _buttons: &[Vec<Button>],
    ) -> anyhow::Result<()> {
        info!(chat_id, "chat transport disabled, dropping text: {text}");
        Ok(())
    }

    async fn send_photo(&self, chat_id: &str, path: &Path, _caption: &str) -> anyhow::Result<()> {
        info!(chat_id, "chat transport disabled, dropping photo: {}", path.display());
        Ok(())
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        _message_id: i64,
        text: &str,
        _buttons: &[Vec<Button>],
    ) -> anyhow::Result<()> {
        info!(chat_id, "chat transport disabled, dropping edit: {text}");
        Ok(())
    }

    async fn fetch_file(&self, _file_id: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("no chat transport configured")
    }
}
