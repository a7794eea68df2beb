use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use pies_types::domain::schedule::LookaheadWindow;
use pies_types::ports::notifier::Notifier;
use pies_types::ports::store::Store;
use tokio::time::MissedTickBehavior;

use crate::application::chat::UserId;
use crate::application::messages;
use crate::application::order_service::OrderService;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
    pub marked: usize,
}

/// Periodically tells every operator about orders due about a day ahead.
pub struct ReminderSweep<S: Store, N: Notifier> {
    service: Arc<OrderService<S>>,
    notifier: Arc<N>,
    operators: Vec<UserId>,
    window: LookaheadWindow,
    interval: Duration,
}

impl<S: Store, N: Notifier> ReminderSweep<S, N> {
    pub fn new(
        service: Arc<OrderService<S>>,
        notifier: Arc<N>,
        operators: Vec<UserId>,
        window: LookaheadWindow,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            notifier,
            operators,
            window,
            interval,
        }
    }

    /// One pass over the window ahead of `now`. A delivery failure for one
    /// operator never stops the others; an order reached at least once is
    /// marked reminded.
    pub async fn run_once(&self, now: NaiveDateTime) -> Result<SweepReport, AppError> {
        let due = self.service.list_upcoming(now, self.window).await?;
        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };

        for row in &due {
            let text = messages::reminder(row);
            let mut reached = false;
            for &operator in &self.operators {
                match self.notifier.notify(operator, &text).await {
                    Ok(()) => {
                        reached = true;
                        report.delivered += 1;
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(order_id = %row.order.id, error = %e, "reminder not delivered");
                    }
                }
            }
            // Marking is per order. An operator whose send failed in this sweep
            // does not get this reminder again once another operator was reached.
            if reached {
                match self.service.mark_reminded(row.order.id).await {
                    Ok(true) => report.marked += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(order_id = %row.order.id, error = %e, "failed to mark order reminded")
                    }
                }
            }
        }

        tracing::info!(
            due = report.due,
            delivered = report.delivered,
            failed = report.failed,
            "reminder sweep finished"
        );
        Ok(report)
    }

    /// Runs forever; the first sweep happens right away.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Local::now().naive_local()).await {
                tracing::error!(error = %e, "reminder sweep failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use pies_repo::memory::InMemoryRepo;
    use pies_types::domain::catalog::Catalog;
    use pies_types::domain::order::OrderId;
    use pies_types::ports::notifier::NotifyError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(i64, String)>>,
        refuse: Vec<i64>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError> {
            if self.refuse.contains(&recipient) {
                return Err(NotifyError {
                    recipient,
                    reason: "Forbidden: bot was blocked by the user".into(),
                });
            }
            self.sent.lock().unwrap().push((recipient, text.to_string()));
            Ok(())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 17)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    async fn service_with_orders(
        offsets_hours: &[i64],
    ) -> (Arc<OrderService<InMemoryRepo>>, Vec<OrderId>) {
        let svc = Arc::new(OrderService::new(InMemoryRepo::new(), Catalog::default()));
        let customer = svc.create_customer("Anna", "555-0100").await.unwrap();
        let mut ids = Vec::new();
        for h in offsets_hours {
            let items = vec![svc.catalog().line_item("Яблочный", 2).unwrap()];
            let (id, _) = svc
                .create_order(customer, "12 Oak St".into(), items, now() + ChronoDuration::hours(*h))
                .await
                .unwrap();
            ids.push(id);
        }
        (svc, ids)
    }

    fn sweep(
        svc: Arc<OrderService<InMemoryRepo>>,
        notifier: Arc<Recording>,
        operators: Vec<i64>,
    ) -> ReminderSweep<InMemoryRepo, Recording> {
        ReminderSweep::new(
            svc,
            notifier,
            operators,
            LookaheadWindow::default(),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn every_operator_gets_due_orders_once() {
        let (svc, ids) = service_with_orders(&[24, 26, 2]).await;
        let notifier = Arc::new(Recording::default());
        let s = sweep(svc, notifier.clone(), vec![1, 2]);

        let first = s.run_once(now()).await.unwrap();
        assert_eq!(
            first,
            SweepReport {
                due: 1,
                delivered: 2,
                failed: 0,
                marked: 1
            }
        );
        {
            let sent = notifier.sent.lock().unwrap();
            assert_eq!(sent.iter().map(|(to, _)| *to).collect::<Vec<_>>(), vec![1, 2]);
            assert!(sent[0].1.contains(&format!("#{}", ids[0])));
            assert!(sent[0].1.contains("18.02.2026 14:00"));
            assert!(sent[0].1.contains("Яблочный x 2"));
        }

        // an hour later the order is still inside the window but already reminded
        let second = s.run_once(now() + ChronoDuration::hours(1)).await.unwrap();
        assert_eq!(second.due, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn one_failing_operator_does_not_stop_the_sweep() {
        let (svc, _) = service_with_orders(&[23, 25]).await;
        let notifier = Arc::new(Recording {
            refuse: vec![1],
            ..Recording::default()
        });
        let s = sweep(svc.clone(), notifier.clone(), vec![1, 2]);

        let report = s.run_once(now()).await.unwrap();
        assert_eq!(report.due, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.marked, 2);
        assert!(notifier.sent.lock().unwrap().iter().all(|(to, _)| *to == 2));

        // operator 1 is reachable again, but both orders are already marked
        let healthy = Arc::new(Recording::default());
        let again = sweep(svc, healthy.clone(), vec![1, 2])
            .run_once(now() + ChronoDuration::minutes(30))
            .await
            .unwrap();
        assert_eq!(again.due, 0);
        assert!(healthy.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn undelivered_orders_are_retried_next_tick() {
        let (svc, _) = service_with_orders(&[24]).await;
        let refusing = Arc::new(Recording {
            refuse: vec![1],
            ..Recording::default()
        });
        let report = sweep(svc.clone(), refusing, vec![1]).run_once(now()).await.unwrap();
        assert_eq!(report.marked, 0);

        let notifier = Arc::new(Recording::default());
        let report = sweep(svc, notifier.clone(), vec![1])
            .run_once(now() + ChronoDuration::minutes(30))
            .await
            .unwrap();
        assert_eq!(report.marked, 1);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_operators_leaves_orders_new() {
        let (svc, _) = service_with_orders(&[24]).await;
        let s = sweep(svc.clone(), Arc::new(Recording::default()), vec![]);
        let report = s.run_once(now()).await.unwrap();
        assert_eq!(report, SweepReport { due: 1, ..SweepReport::default() });
        assert_eq!(svc.list_upcoming(now(), LookaheadWindow::default()).await.unwrap().len(), 1);
    }
}
