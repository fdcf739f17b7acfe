//! Fire-and-forget side effects of order, review and catalog changes.
//!
//! Each channel runs as its own detached task. A failing channel is logged and
//! dropped; it never affects the request that triggered it or its siblings.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::{
    api::email::{self, Email},
    app_state::AppState,
    models::{CreateNotificationEntity, OrderEntity, OrderStatus, ProductEntity, ReviewEntity},
    notifications,
};

pub fn spawn_best_effort<F>(channel: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = task.await {
            warn!(channel, error = ?err, "Side effect failed, dropping it");
        }
    })
}

fn send_email(state: &AppState, email: Email) -> JoinHandle<()> {
    let client = state.http_client.clone();
    let config = state.config.clone();
    spawn_best_effort("email", async move {
        email::send_email(&client, &config.email, &email).await
    })
}

fn record_notification(state: &AppState, notification: CreateNotificationEntity) -> JoinHandle<()> {
    let pool = state.db_pool.clone();
    spawn_best_effort("notification", async move {
        notifications::create_notification(&pool, notification).await
    })
}

pub fn order_created(state: &AppState, order: &OrderEntity) -> Vec<JoinHandle<()>> {
    vec![
        send_email(state, email::new_order_email(&state.config.email, order)),
        record_notification(state, notifications::order_created(order)),
    ]
}

pub fn order_status_updated(
    state: &AppState,
    order: &OrderEntity,
    previous: OrderStatus,
) -> Vec<JoinHandle<()>> {
    vec![
        send_email(state, email::order_status_email(&state.config.email, order)),
        record_notification(state, notifications::order_status_updated(order, previous)),
    ]
}

pub fn review_submitted(state: &AppState, review: &ReviewEntity) -> JoinHandle<()> {
    record_notification(state, notifications::review_submitted(review))
}

pub fn product_saved(state: &AppState, product: &ProductEntity, created: bool) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);
    if created {
        handles.push(record_notification(state, notifications::product_created(product)));
    }
    if let Some(notification) = notifications::low_stock(product) {
        handles.push(record_notification(state, notification));
    }
    handles
}

pub fn product_deleted(state: &AppState, product: &ProductEntity) -> JoinHandle<()> {
    record_notification(state, notifications::product_deleted(product))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn failing_task_is_contained() {
        let handle = spawn_best_effort("test", async { Err(anyhow::anyhow!("provider down")) });
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn sibling_task_still_runs_when_one_fails() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        let failing = spawn_best_effort("email", async { Err(anyhow::anyhow!("timeout")) });
        let succeeding = spawn_best_effort("notification", async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        failing.await.unwrap();
        succeeding.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
