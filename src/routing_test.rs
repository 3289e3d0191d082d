use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::CleanupAction;
use crate::HttpError;
use crate::InsertedDocument;
use crate::MockAdminApi;
use crate::Session;

fn hello_world() -> RoutingRule {
    RoutingRule::new("/hello/world", "text/html", "moo!")
}

fn response(
    status: u16,
    body: &str,
) -> RawResponse {
    RawResponse {
        status,
        body: body.to_string(),
        ..Default::default()
    }
}

fn policy() -> PollPolicy {
    PollPolicy {
        timeout_ms: 3_000,
        interval_ms: 500,
    }
}

fn inserted(status: u16) -> InsertedDocument {
    InsertedDocument {
        id: "_routing/1234".into(),
        key: "1234".into(),
        rev: "_abc".into(),
        status,
    }
}

#[test]
fn rule_document_has_server_shape() {
    assert_eq!(
        hello_world().to_document(),
        json!({
            "url": { "match": "/hello/world" },
            "content": { "contentType": "text/html", "body": "moo!" },
        })
    );
}

#[test]
fn rule_is_effective_only_with_200_and_body() {
    let rule = hello_world();

    assert!(rule.observe(&response(200, "<p>moo!</p>")).is_effective());
    assert!(!rule.observe(&response(404, "moo!")).is_effective());
    assert!(!rule.observe(&response(200, "welcome")).is_effective());

    match rule.observe(&response(404, "not found")) {
        Observation::Pending(reason) => assert!(reason.contains("404")),
        Observation::Effective => panic!("404 must not count as active"),
    }
}

#[test]
fn lifecycle_happy_path_ends_active() {
    let state = RouteState::Absent
        .apply(&RouteEvent::Inserted("_routing/1".into()))
        .unwrap()
        .apply(&RouteEvent::ReloadTriggered)
        .unwrap()
        .apply(&RouteEvent::EffectObserved)
        .unwrap();

    assert_eq!(state, RouteState::Active { id: "_routing/1".into() });
    assert!(state.is_terminal());
    assert_eq!(state.apply(&RouteEvent::Deleted).unwrap(), RouteState::Absent);
}

#[test]
fn timed_out_rule_can_still_be_deleted() {
    let state = RouteState::ReloadTriggered { id: "_routing/1".into() }
        .apply(&RouteEvent::WaitExhausted)
        .unwrap();

    assert_eq!(state, RouteState::TimedOut { id: "_routing/1".into() });
    assert!(state.is_terminal());
    assert_eq!(state.apply(&RouteEvent::Deleted).unwrap(), RouteState::Absent);
}

#[test]
fn out_of_order_events_are_rejected() {
    let inserted = RouteState::Inserted { id: "_routing/1".into() };
    let active = RouteState::Active { id: "_routing/1".into() };

    let illegal = [
        (RouteState::Absent, RouteEvent::ReloadTriggered),
        (RouteState::Absent, RouteEvent::Deleted),
        (inserted.clone(), RouteEvent::EffectObserved),
        (inserted, RouteEvent::Inserted("_routing/2".into())),
        (active.clone(), RouteEvent::EffectObserved),
        (active, RouteEvent::ReloadTriggered),
    ];

    for (state, event) in illegal {
        assert!(
            matches!(state.apply(&event), Err(Error::IllegalTransition { .. })),
            "{state} accepted {event:?}"
        );
    }
}

#[tokio::test]
async fn insert_creates_collection_and_registers_cleanup() {
    let mut api = MockAdminApi::new();
    api.expect_create_collection()
        .withf(|db, options| {
            db == "_system"
                && options.name == "_routing"
                && options.is_system
                && options.distribute_shards_like.as_deref() == Some("_users")
        })
        .times(1)
        .returning(|_, _| Ok(()));
    api.expect_insert_document()
        .withf(|db, collection, body| {
            db == "_system" && collection == "_routing" && body["url"]["match"] == "/hello/world"
        })
        .times(1)
        .returning(|_, _, _| Ok(inserted(202)));
    api.expect_remove_document().times(1).returning(|_, _| Ok(()));
    api.expect_drop_collection().times(1).returning(|_, _, _| Ok(()));

    let api: Arc<dyn AdminApi> = Arc::new(api);
    let mut session = Session::new(api.clone());
    let mut teardown = Teardown::begin(&session);
    let mut activation = RouteActivation::new(api, "_system", hello_world(), policy());

    activation.insert(&mut teardown).await.unwrap();

    assert_eq!(activation.state(), &RouteState::Inserted { id: "_routing/1234".into() });
    assert_eq!(
        teardown.pending(),
        &[
            CleanupAction::DropCollection {
                database: "_system".into(),
                name: "_routing".into(),
                is_system: true,
            },
            CleanupAction::RemoveDocument {
                database: "_system".into(),
                id: "_routing/1234".into(),
            },
        ]
    );
    assert!(teardown.run(&mut session).await.is_clean());
}

#[tokio::test]
async fn insert_with_unexpected_status_still_registers_the_document() {
    let mut api = MockAdminApi::new();
    api.expect_create_collection().returning(|_, options| {
        Err(HttpError::Conflict {
            resource: options.name,
        }
        .into())
    });
    api.expect_insert_document().returning(|_, _, _| Ok(inserted(201)));
    api.expect_remove_document().times(1).returning(|_, _| Ok(()));

    let api: Arc<dyn AdminApi> = Arc::new(api);
    let mut session = Session::new(api.clone());
    let mut teardown = Teardown::begin(&session);
    let mut activation = RouteActivation::new(api, "_system", hello_world(), policy());

    let result = activation.insert(&mut teardown).await;

    assert!(matches!(
        result,
        Err(Error::Setup(SetupError::UnexpectedStatus {
            expected: 202,
            actual: 201,
            ..
        }))
    ));
    assert_eq!(activation.state(), &RouteState::Absent);
    assert_eq!(teardown.pending().len(), 1);
    assert_eq!(teardown.run(&mut session).await.applied, 1);
}

#[tokio::test]
async fn activate_before_insert_is_rejected_without_calling_the_server() {
    let mut activation = RouteActivation::new(Arc::new(MockAdminApi::new()), "_system", hello_world(), policy());

    let result = activation.activate().await;

    assert!(matches!(result, Err(Error::IllegalTransition { from: "Absent", .. })));
}

fn serving_after(nth: u32) -> MockAdminApi {
    let calls = Arc::new(AtomicU32::new(0));
    let mut api = MockAdminApi::new();
    api.expect_create_collection().returning(|_, _| Ok(()));
    api.expect_insert_document().returning(|_, _, _| Ok(inserted(202)));
    api.expect_trigger_routing_reload().times(1).returning(|_| Ok(()));
    api.expect_remove_document().returning(|_, _| Ok(()));
    api.expect_drop_collection().returning(|_, _, _| Ok(()));
    api.expect_raw_get()
        .withf(|path, _| path == "/_db/_system/hello/world")
        .returning(move |_, _| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= nth {
                response(200, "moo!")
            } else {
                response(404, "{\"error\":true}")
            })
        });
    api
}

#[tokio::test(start_paused = true)]
async fn activate_polls_until_rule_serves_traffic() {
    let api: Arc<dyn AdminApi> = Arc::new(serving_after(3));
    let mut session = Session::new(api.clone());
    let mut teardown = Teardown::begin(&session);
    let mut activation = RouteActivation::new(api, "_system", hello_world(), policy());

    activation.insert(&mut teardown).await.unwrap();
    let attempts = activation.activate().await.unwrap();

    assert_eq!(attempts, 3);
    assert_eq!(activation.state(), &RouteState::Active { id: "_routing/1234".into() });
    assert_eq!(teardown.run(&mut session).await.applied, 2);
}

#[tokio::test(start_paused = true)]
async fn activate_ends_timed_out_when_reload_never_applies() {
    let api: Arc<dyn AdminApi> = Arc::new(serving_after(u32::MAX));
    let mut session = Session::new(api.clone());
    let mut teardown = Teardown::begin(&session);
    let mut activation = RouteActivation::new(api, "_system", hello_world(), policy());

    activation.insert(&mut teardown).await.unwrap();
    let result = activation.activate().await;

    assert!(result.unwrap_err().is_timeout());
    assert_eq!(activation.state(), &RouteState::TimedOut { id: "_routing/1234".into() });

    // deletion is owed whichever terminal state was reached
    assert_eq!(teardown.run(&mut session).await.applied, 2);
}

#[tokio::test]
async fn delete_tolerates_missing_document() {
    let mut api = MockAdminApi::new();
    api.expect_create_collection().returning(|_, _| Ok(()));
    api.expect_insert_document().returning(|_, _, _| Ok(inserted(202)));
    api.expect_remove_document().times(2).returning(|_, id| {
        Err(HttpError::NotFound {
            resource: id.to_string(),
        }
        .into())
    });

    let api: Arc<dyn AdminApi> = Arc::new(api);
    let mut session = Session::new(api.clone());
    let mut teardown = Teardown::begin(&session);
    let mut activation = RouteActivation::new(api, "_system", hello_world(), policy());

    activation.insert(&mut teardown).await.unwrap();
    activation.delete().await.unwrap();
    assert_eq!(activation.state(), &RouteState::Absent);

    let report = teardown.run(&mut session).await;
    assert_eq!(report.already_absent, 1);
    assert!(report.is_clean());
}
