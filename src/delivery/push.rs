use futures::{Stream, StreamExt};

use crate::usecase::contracts::NotificationRepository;
use crate::usecase::notifications::NotificationStore;

/// Forwards every message of a push transport into the store until the
/// stream ends or the store is disposed. Returns the number of accepted
/// push-arrival signals.
pub async fn listen<R, S, P>(store: &NotificationStore<R>, messages: S) -> usize
where
    R: NotificationRepository,
    S: Stream<Item = P>,
    P: AsRef<[u8]>,
{
    futures::pin_mut!(messages);
    let mut accepted = 0;

    while let Some(payload) = messages.next().await {
        if store.is_disposed() {
            tracing::debug!(user_id = %store.user_id(), "store disposed, stopping push listener");
            break;
        }
        if store.on_push_arrived(payload.as_ref()).await {
            accepted += 1;
        }
    }

    tracing::debug!(user_id = %store.user_id(), accepted, "push listener stopped");
    accepted
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use mockall::predicate::eq;

    use super::*;
    use crate::domain::notification::{NotificationItem, NotificationPage};
    use crate::usecase::contracts::MockNotificationRepository;
    use crate::usecase::notifications::StoreConfig;

    fn store(mock: MockNotificationRepository) -> NotificationStore<MockNotificationRepository> {
        NotificationStore::new("user-1", StoreConfig::new("https://api.onekamer.test"), mock)
    }

    #[tokio::test]
    async fn test_listen_counts_only_push_signals() {
        let store = store(MockNotificationRepository::new());
        let messages = stream::iter(vec![
            br#"{"type":"NEW_PUSH"}"#.to_vec(),
            br#"{"type":"SW_READY"}"#.to_vec(),
            b"{not json".to_vec(),
            br#"{"type":"NEW_PUSH"}"#.to_vec(),
        ]);

        let accepted = listen(&store, messages).await;

        assert_eq!(accepted, 2);
        assert_eq!(store.unread_count(), 2);
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_listen_refetches_when_open() {
        let mut mock = MockNotificationRepository::new();
        mock.expect_list()
            .with(eq("user-1"), eq(20u32), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| {
                Ok(NotificationPage {
                    items: vec![NotificationItem::new("n1", "Nouveau message", "rencontre")],
                    unread_count: 1,
                    has_more: false,
                    next_cursor: None,
                })
            });

        let store = store(mock);
        store.set_open(true);

        let accepted = listen(&store, stream::iter([&br#"{"type":"NEW_PUSH"}"#[..]])).await;

        assert_eq!(accepted, 1);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_listen_stops_after_dispose() {
        let store = store(MockNotificationRepository::new());
        store.dispose();

        let accepted = listen(&store, stream::iter(vec![br#"{"type":"NEW_PUSH"}"#.to_vec()])).await;

        assert_eq!(accepted, 0);
        assert_eq!(store.unread_count(), 0);
    }
}
