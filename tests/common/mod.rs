//! In-process stand-in for the database's admin API.
//!
//! Keeps databases, collections and documents in memory. A routing reload is
//! accepted immediately and applied after `reload_delay`, or never when the
//! delay is `None`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use clusterprobe::ClientBuilder;
use clusterprobe::DatabaseHandle;
use clusterprobe::HttpAdminClient;
use clusterprobe::Migration;
use clusterprobe::SetupError;
use serde_json::json;
use serde_json::Value;
use tokio::sync::oneshot;
use warp::http::Method;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::path::FullPath;
use warp::reply::Response;
use warp::Filter;
use warp::Reply;

pub const SYSTEM: &str = "_system";

#[derive(Debug, Clone)]
pub struct Route {
    pub content_type: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct ServerState {
    /// Database name -> properties as the server reports them
    pub databases: BTreeMap<String, Value>,
    /// (database, collection) -> key -> document
    pub collections: BTreeMap<(String, String), BTreeMap<String, Value>>,
    /// Database -> URL -> route currently served
    pub active_routes: HashMap<String, HashMap<String, Route>>,
    pub reload_delay: Option<Duration>,
    pub reloads: u32,
    next_key: u64,
}

pub type SharedState = Arc<Mutex<ServerState>>;

pub struct FakeServer {
    pub addr: SocketAddr,
    pub state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeServer {
    pub async fn start(reload_delay: Option<Duration>) -> Self {
        let mut state = ServerState {
            reload_delay,
            ..Default::default()
        };
        state.databases.insert(
            SYSTEM.to_string(),
            json!({ "name": SYSTEM, "id": "1", "isSystem": true, "path": "none" }),
        );
        let state: SharedState = Arc::new(Mutex::new(state));

        let with_state = {
            let state = state.clone();
            warp::any().map(move || state.clone())
        };
        let routes = warp::method()
            .and(warp::path::full())
            .and(warp::query::<HashMap<String, String>>())
            .and(warp::body::bytes())
            .and(with_state)
            .map(handle);

        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
            rx.await.ok();
        });
        tokio::spawn(server);

        Self {
            addr,
            state,
            shutdown: Some(tx),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> HttpAdminClient {
        ClientBuilder::new(self.endpoint())
            .request_timeout(Duration::from_secs(5))
            .build()
            .expect("client for fake server")
    }

    pub fn has_database(
        &self,
        name: &str,
    ) -> bool {
        self.state.lock().unwrap().databases.contains_key(name)
    }

    pub fn has_collection(
        &self,
        database: &str,
        name: &str,
    ) -> bool {
        self.state
            .lock()
            .unwrap()
            .collections
            .contains_key(&(database.to_string(), name.to_string()))
    }

    pub fn documents(
        &self,
        database: &str,
        collection: &str,
    ) -> usize {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, BTreeMap::len)
    }

    pub fn reloads(&self) -> u32 {
        self.state.lock().unwrap().reloads
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn json_reply(
    status: StatusCode,
    body: Value,
) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn error_reply(
    status: StatusCode,
    message: &str,
) -> Response {
    json_reply(
        status,
        json!({ "error": true, "code": status.as_u16(), "errorMessage": message }),
    )
}

fn handle(
    method: Method,
    path: FullPath,
    query: HashMap<String, String>,
    body: Bytes,
    state: SharedState,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let segments: Vec<&str> = path.as_str().trim_start_matches('/').split('/').collect();

    match (&method, segments.as_slice()) {
        (&Method::POST, ["_api", "database"]) => create_database(&state, body),
        (&Method::DELETE, ["_api", "database", name]) => drop_database(&state, name),
        (_, ["_db", db, rest @ ..]) => {
            if !state.lock().unwrap().databases.contains_key(*db) {
                return error_reply(StatusCode::NOT_FOUND, "database not found");
            }
            database_scoped(&state, &method, db, rest, &query, body)
        }
        _ => error_reply(StatusCode::NOT_FOUND, "unknown path"),
    }
}

fn as_factor(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or_else(|| json!(1))
}

fn create_database(
    state: &SharedState,
    body: Value,
) -> Response {
    let Some(name) = body["name"].as_str().map(str::to_string) else {
        return error_reply(StatusCode::BAD_REQUEST, "name missing");
    };
    let mut state = state.lock().unwrap();
    if state.databases.contains_key(&name) {
        return error_reply(StatusCode::CONFLICT, "duplicate database name");
    }

    let options = &body["options"];
    let min = options.get("minReplicationFactor").or_else(|| options.get("writeConcern"));
    state.next_key += 1;
    let props = json!({
        "name": name,
        "id": state.next_key.to_string(),
        "isSystem": false,
        "path": "none",
        "sharding": options.get("sharding").cloned().unwrap_or_else(|| json!("")),
        "replicationFactor": as_factor(options.get("replicationFactor")),
        "minReplicationFactor": as_factor(min),
        "writeConcern": as_factor(min),
    });
    state.databases.insert(name, props);
    json_reply(StatusCode::CREATED, json!({ "error": false, "code": 201, "result": true }))
}

fn drop_database(
    state: &SharedState,
    name: &str,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.databases.remove(name).is_none() {
        return error_reply(StatusCode::NOT_FOUND, "database not found");
    }
    state.collections.retain(|(db, _), _| db != name);
    state.active_routes.remove(name);
    json_reply(StatusCode::OK, json!({ "error": false, "code": 200, "result": true }))
}

fn database_scoped(
    state: &SharedState,
    method: &Method,
    db: &str,
    rest: &[&str],
    query: &HashMap<String, String>,
    body: Value,
) -> Response {
    let mut guard = state.lock().unwrap();
    let db_key = db.to_string();

    match (method, rest) {
        (&Method::GET, ["_api", "database", "current"]) => {
            let Some(props) = guard.databases.get(db).cloned() else {
                return error_reply(StatusCode::NOT_FOUND, "database not found");
            };
            json_reply(StatusCode::OK, json!({ "error": false, "code": 200, "result": props }))
        }
        (&Method::POST, ["_api", "collection"]) => {
            let Some(name) = body["name"].as_str().map(str::to_string) else {
                return error_reply(StatusCode::BAD_REQUEST, "name missing");
            };
            let key = (db_key, name.clone());
            if guard.collections.contains_key(&key) {
                return error_reply(StatusCode::CONFLICT, "duplicate collection name");
            }
            guard.collections.insert(key, BTreeMap::new());
            json_reply(StatusCode::OK, json!({ "name": name, "isSystem": name.starts_with('_') }))
        }
        (&Method::DELETE, ["_api", "collection", name]) => {
            if guard.collections.remove(&(db_key, name.to_string())).is_none() {
                return error_reply(StatusCode::NOT_FOUND, "collection not found");
            }
            json_reply(StatusCode::OK, json!({ "error": false, "code": 200 }))
        }
        (&Method::POST, ["_api", "document"]) => {
            let Some(collection) = query.get("collection").cloned() else {
                return error_reply(StatusCode::BAD_REQUEST, "collection missing");
            };
            guard.next_key += 1;
            let key = guard.next_key.to_string();
            let Some(documents) = guard.collections.get_mut(&(db_key, collection.clone())) else {
                return error_reply(StatusCode::NOT_FOUND, "collection not found");
            };
            documents.insert(key.clone(), body);

            // routing rules are accepted, not applied
            let status = if collection == "_routing" {
                StatusCode::ACCEPTED
            } else {
                StatusCode::CREATED
            };
            json_reply(
                status,
                json!({ "_id": format!("{collection}/{key}"), "_key": key, "_rev": format!("_r{key}") }),
            )
        }
        (&Method::DELETE, ["_api", "document", collection, key]) => {
            let removed = guard
                .collections
                .get_mut(&(db_key, collection.to_string()))
                .and_then(|documents| documents.remove(*key));
            match removed {
                Some(_) => json_reply(StatusCode::OK, json!({ "_id": format!("{collection}/{key}") })),
                None => error_reply(StatusCode::NOT_FOUND, "document not found"),
            }
        }
        (&Method::GET, ["_admin", "routing", "reload"]) => {
            guard.reloads += 1;
            let table: HashMap<String, Route> = guard
                .collections
                .get(&(db_key.clone(), "_routing".to_string()))
                .map(|rules| {
                    rules
                        .values()
                        .filter_map(|rule| {
                            Some((
                                rule["url"]["match"].as_str()?.to_string(),
                                Route {
                                    content_type: rule["content"]["contentType"].as_str()?.to_string(),
                                    body: rule["content"]["body"].as_str()?.to_string(),
                                },
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default();

            if let Some(delay) = guard.reload_delay {
                let state = state.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    state.lock().unwrap().active_routes.insert(db_key, table);
                });
            }
            json_reply(StatusCode::OK, json!({ "error": false, "code": 200 }))
        }
        (&Method::GET, _) => {
            let url = format!("/{}", rest.join("/"));
            match guard.active_routes.get(db).and_then(|routes| routes.get(&url)) {
                Some(route) => warp::reply::with_header(
                    warp::reply::with_status(route.body.clone(), StatusCode::OK),
                    "content-type",
                    route.content_type.clone(),
                )
                .into_response(),
                None => error_reply(StatusCode::NOT_FOUND, "unknown path"),
            }
        }
        _ => error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not supported"),
    }
}

/// Server-side copy standing in for a dump/restore tool.
///
/// With `drop_fields`, the listed properties are lost on the way.
pub struct ServerSideCopy {
    pub state: SharedState,
    pub drop_fields: Vec<&'static str>,
}

#[async_trait]
impl Migration for ServerSideCopy {
    async fn migrate(
        &self,
        source: &DatabaseHandle,
        destination: &DatabaseHandle,
    ) -> clusterprobe::Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(mut props) = state.databases.get(&source.name).cloned() else {
            return Err(SetupError::Migration(format!("{} does not exist", source.name)).into());
        };
        props["name"] = json!(destination.name);
        if let Some(fields) = props.as_object_mut() {
            for field in &self.drop_fields {
                fields.remove(*field);
            }
        }
        state.databases.insert(destination.name.clone(), props);
        Ok(())
    }
}
