use anyhow::Context;
use futures::stream::{BoxStream, StreamExt};

/// Subject carrying push-arrival messages for one user.
pub fn push_subject(prefix: &str, user_id: &str) -> String {
    format!("{}.{}", prefix.trim_end_matches('.'), user_id)
}

/// Subscribes to the user's push subject and yields raw message payloads.
pub async fn push_messages(
    client: &async_nats::Client,
    subject: String,
) -> anyhow::Result<BoxStream<'static, Vec<u8>>> {
    let subscriber = client
        .subscribe(subject.clone())
        .await
        .with_context(|| format!("failed to subscribe to {subject}"))?;

    tracing::info!(%subject, "subscribed to push signals");

    Ok(subscriber.map(|message| message.payload.to_vec()).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_subject() {
        assert_eq!(push_subject("notifications.push", "user-1"), "notifications.push.user-1");
        assert_eq!(push_subject("notifications.push.", "abc"), "notifications.push.abc");
    }
}
