use serde_json::json;

use super::*;
use crate::ShardingMode;

fn properties(result: serde_json::Value) -> DatabaseProperties {
    let envelope: ApiEnvelope<DatabaseProperties> =
        serde_json::from_value(json!({ "error": false, "code": 200, "result": result })).unwrap();
    envelope.result
}

#[test]
fn decodes_cluster_properties_from_envelope() {
    let props = properties(json!({
        "name": "UnitTestsDumpProperties1Dst",
        "id": "1234",
        "isSystem": false,
        "sharding": "flexible",
        "replicationFactor": 3,
        "minReplicationFactor": 2,
        "path": "none",
    }));

    assert_eq!(props.name, "UnitTestsDumpProperties1Dst");
    assert_eq!(props.sharding.as_deref(), Some("flexible"));
    assert_eq!(props.replication_factor, Some(json!(3)));

    let config = props.to_cluster_config().unwrap();
    assert_eq!(config.sharding(), ShardingMode::Flexible);
    assert_eq!(config.replication_factor(), 3);
    assert_eq!(config.min_replication_factor(), 2);
}

#[test]
fn write_concern_backs_missing_min_replication_factor() {
    let props = properties(json!({
        "name": "db",
        "sharding": "single",
        "replicationFactor": 2,
        "writeConcern": 1,
    }));

    assert_eq!(props.effective_min_replication_factor(), Some(&json!(1)));
    assert_eq!(props.to_cluster_config().unwrap().min_replication_factor(), 1);
}

#[test]
fn both_min_replication_spellings_decode_side_by_side() {
    let props = properties(json!({
        "name": "db",
        "minReplicationFactor": 2,
        "writeConcern": 2,
    }));

    assert_eq!(props.effective_min_replication_factor(), Some(&json!(2)));
}

#[test]
fn non_cluster_database_has_no_config() {
    let props = properties(json!({ "name": "_system", "isSystem": true }));

    assert!(props.is_system);
    assert!(props.sharding.is_none());
    assert!(props.to_cluster_config().is_err());
}

#[test]
fn stringly_typed_factors_are_rejected() {
    let props = properties(json!({
        "name": "db",
        "sharding": "flexible",
        "replicationFactor": "3",
        "minReplicationFactor": 2,
    }));

    assert!(matches!(
        props.to_cluster_config(),
        Err(crate::Error::Http(crate::HttpError::Decode { .. }))
    ));
}

#[test]
fn collection_options_mark_underscore_names_as_system() {
    let options = CollectionOptions::new("_routing").distribute_shards_like("_users");
    assert_eq!(
        serde_json::to_value(&options).unwrap(),
        json!({ "name": "_routing", "isSystem": true, "distributeShardsLike": "_users" })
    );

    let plain = CollectionOptions::new("things");
    assert_eq!(
        serde_json::to_value(&plain).unwrap(),
        json!({ "name": "things", "isSystem": false })
    );
}

#[test]
fn inserted_document_ignores_status_in_body() {
    let doc: InsertedDocument =
        serde_json::from_value(json!({ "_id": "_routing/1", "_key": "1", "_rev": "_a" })).unwrap();
    assert_eq!(doc.id, "_routing/1");
    assert_eq!(doc.status, 0);
}

#[test]
fn raw_response_header_lookup_is_case_insensitive() {
    let mut response = RawResponse {
        status: 200,
        body: "<html>moo!</html>".into(),
        ..RawResponse::default()
    };
    response.headers.insert("content-encoding".into(), "gzip".into());

    assert_eq!(response.header("Content-Encoding"), Some("gzip"));
    assert!(response.is_success());
    assert!(response.body_contains("moo!"));
}
