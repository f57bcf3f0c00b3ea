#![cfg(feature = "sqlite")]

use metamodel::StatementKind;
use metamodel::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::layer::SubscriberExt;

struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn dropping_a_transaction_with_open_statements_warns_once() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

    tracing::subscriber::with_default(subscriber, || {
        let tx = metamodel::sqlite::open(&SqliteConfig::memory()).expect("open sqlite memory db");
        tx.begin().expect("begin");
        for _ in 0..3 {
            let handle = tx
                .create_statement(StatementKind::Select, "SELECT 1")
                .expect("statement");
            tx.prepare(handle).expect("prepare");
        }
        assert_eq!(tx.open_statements(), 3);
    });

    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[test]
fn closing_twice_fails_and_keeps_the_set() {
    let tx = metamodel::sqlite::open(&SqliteConfig::memory()).expect("open sqlite memory db");
    let kept = tx
        .create_statement(StatementKind::Select, "SELECT 1")
        .expect("statement");
    let closed = tx
        .create_statement(StatementKind::Select, "SELECT 2")
        .expect("statement");
    tx.close_statement(closed).expect("close");

    let err = tx.close_statement(closed).unwrap_err();
    assert_eq!(err.usage_kind(), Some(metamodel::UsageErrorKind::UnknownStatement));
    assert_eq!(tx.open_statements(), 1);
    tx.close_statement(kept).expect("close");
}
