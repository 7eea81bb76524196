//! Integration tests for schema lifecycle: canonical identity, alias
//! uniqueness, rename safety, tombstones, and versioning.

use aliasforge::clock::FixedClock;
use aliasforge::naming::StopWordValidator;
use aliasforge::prelude::*;
use std::sync::Arc;

fn manager() -> StoreManager {
    let repo = Arc::new(LocalRepository::new());
    StoreManager::with_parts(repo, StopWordValidator::new(), Arc::new(FixedClock(1_000)))
}

async fn seed_acme(manager: &StoreManager) {
    let draft = manager.create_org("acme").metric(
        MetricDraft::create("pageview")
            .alias("pv")
            .field(FieldDraft::new("url", FieldType::String).alias("u"))
            .with_long("count"),
    );
    manager.commit(draft).await.unwrap();
}

#[tokio::test]
async fn test_alias_resolution_round_trips() {
    let manager = manager();
    seed_acme(&manager).await;

    let clerk = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let canonical = clerk.resolve_metric("pv").unwrap().to_string();

    // The canonical id's current alias list always contains the alias we
    // resolved through
    let aliases = clerk.metric_aliases(&canonical).unwrap();
    assert!(aliases.contains(&"pv".to_string()));
    assert_eq!(aliases[0], "pageview");
}

#[tokio::test]
async fn test_duplicate_org_rejected() {
    let manager = manager();
    seed_acme(&manager).await;

    let err = manager
        .commit(manager.create_org("acme").metric(MetricDraft::create("click")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[tokio::test]
async fn test_metric_alias_unique_org_wide() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .metric(MetricDraft::create("click").alias("pv"));
    let err = manager.commit(draft).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));

    // Zero side effects: the failed build committed nothing
    let clerk = StoreClerk::load(manager.store(), "acme").await.unwrap();
    assert!(clerk.resolve_metric("click").is_err());
    assert_eq!(clerk.org().version, 0);
}

#[tokio::test]
async fn test_field_alias_unique_within_metric() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .add_field("pageview", FieldDraft::new("path", FieldType::String).alias("u"));
    let err = manager.commit(draft).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[tokio::test]
async fn test_rename_preserves_canonical_and_bumps_version_once() {
    let manager = manager();
    seed_acme(&manager).await;

    let before = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let canonical = before.resolve_metric("pageview").unwrap().to_string();
    let metric_version = before.metric("pageview").unwrap().version;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .rename_metric("pageview", "page_view")
        .rename_field("page_view", "url", "page_url");
    manager.commit(draft).await.unwrap();

    let after = StoreClerk::load(manager.store(), "acme").await.unwrap();
    assert_eq!(after.resolve_metric("page_view").unwrap(), canonical);
    // Old names survive as plain aliases
    assert_eq!(after.resolve_metric("pageview").unwrap(), canonical);
    assert_eq!(after.org().version, before.org().version + 1);

    let metric = after.metric("page_view").unwrap();
    assert_eq!(metric.version, metric_version + 1);
    let field = metric.resolve_field("page_url").unwrap();
    assert_eq!(metric.resolve_field("url"), Some(field));
    assert_eq!(metric.field_display_name(field), Some("page_url"));
}

#[tokio::test]
async fn test_adding_alias_keeps_canonical() {
    let manager = manager();
    seed_acme(&manager).await;

    let before = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let canonical = before.resolve_metric("pageview").unwrap().to_string();

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .add_metric_alias("pageview", "views")
        .add_field_alias("pageview", "url", "link");
    manager.commit(draft).await.unwrap();

    let after = StoreClerk::load(manager.store(), "acme").await.unwrap();
    assert_eq!(after.resolve_metric("views").unwrap(), canonical);
    let metric = after.metric("views").unwrap();
    assert_eq!(metric.resolve_field("link"), metric.resolve_field("url"));
}

#[tokio::test]
async fn test_delete_metric_tombstones_and_never_reuses_id() {
    let manager = manager();
    seed_acme(&manager).await;

    let before = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let canonical = before.resolve_metric("pageview").unwrap().to_string();

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .delete_metric("pageview");
    manager.commit(draft).await.unwrap();

    let after = StoreClerk::load(manager.store(), "acme").await.unwrap();
    assert!(after.resolve_metric("pageview").is_err());
    assert!(after.org().is_tombstoned(&canonical));
    assert!(after.list_metrics().is_empty());

    // A new metric can reuse the alias but never the canonical id
    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .metric(MetricDraft::create("pageview"));
    manager.commit(draft).await.unwrap();

    let rebuilt = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let new_canonical = rebuilt.resolve_metric("pageview").unwrap();
    assert_ne!(new_canonical, canonical);
    assert!(rebuilt.org().is_tombstoned(&canonical));
}

#[tokio::test]
async fn test_unknown_alias_update_is_not_found() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .add_metric_alias("no_such_metric", "x");
    let err = manager.commit(draft).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_reserved_names_rejected_together() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .add_field("pageview", FieldDraft::new("_f9", FieldType::Long))
        .add_metric_alias("pageview", "_shadow");
    let err = manager.commit(draft).await.unwrap_err();
    match err {
        Error::ReservedName(names) => {
            assert!(names.contains(&"_f9".to_string()));
            assert!(names.contains(&"_shadow".to_string()));
        }
        e => panic!("expected ReservedName, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_field_listing_reports_types_and_hidden_state() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .soft_delete_field("pageview", "count");
    manager.commit(draft).await.unwrap();

    let clerk = StoreClerk::load(manager.store(), "acme").await.unwrap();
    let fields = clerk.list_fields("pageview").unwrap();
    assert_eq!(fields.len(), 2);

    let url = fields.iter().find(|f| f.display_name == "url").unwrap();
    assert_eq!(url.field_type, FieldType::String);
    assert_eq!(url.aliases, vec!["url".to_string(), "u".to_string()]);
    assert!(url.hidden_at.is_none());

    let count = fields.iter().find(|f| f.display_name == "count").unwrap();
    assert_eq!(count.field_type, FieldType::Long);
    assert_eq!(count.hidden_at, Some(1_000));
}

#[tokio::test]
async fn test_org_settings_survive_commit() {
    let manager = manager();
    seed_acme(&manager).await;

    let draft = manager
        .update_org("acme")
        .await
        .unwrap()
        .timestamp_patterns(vec![TimestampPattern::Iso8601])
        .metric_key_fields(vec!["event".to_string()]);
    manager.commit(draft).await.unwrap();

    let clerk = StoreClerk::load(manager.store(), "acme").await.unwrap();
    assert_eq!(clerk.timestamp_patterns(), &[TimestampPattern::Iso8601]);
    assert_eq!(clerk.metric_key_fields(), &["event".to_string()]);
}
