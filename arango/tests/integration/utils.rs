use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use arango::errors::TransportError;
use arango::network::{HttpRequest, HttpResponse, Transport};
use arango::{Database, DatabaseBuilder, LoadBalancingStrategy};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(tracing_subscriber::fmt::TestWriter::new())
        .try_init();
}

/// Round-robin database over `hosts`, talking to `server`.
pub(crate) fn database(server: &FakeArango, hosts: &[&str]) -> Database {
    DatabaseBuilder::new()
        .known_hosts(hosts.iter().copied())
        .load_balancing_strategy(LoadBalancingStrategy::RoundRobin)
        .transport(Arc::new(server.clone()))
        .build()
        .unwrap()
}

pub(crate) fn body(request: &HttpRequest) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).unwrap()
}

const DEFAULT_BATCH_SIZE: usize = 1000;

type Documents = BTreeMap<String, Value>;

#[derive(Debug)]
struct StagedWrite {
    collection: String,
    key: String,
    document: Option<Value>,
}

#[derive(Debug)]
struct ServerTransaction {
    database: String,
    host: String,
    status: &'static str,
    writes: Vec<StagedWrite>,
}

#[derive(Debug)]
struct ServerCursor {
    host: String,
    remaining: VecDeque<Value>,
    batch_size: usize,
}

#[derive(Debug, Default)]
struct ServerState {
    databases: HashMap<String, HashMap<String, Documents>>,
    transactions: HashMap<String, ServerTransaction>,
    cursors: HashMap<String, ServerCursor>,
    endpoints: Vec<String>,
    down: HashSet<String>,
    requests: Vec<HttpRequest>,
    next_id: u64,
}

/// In-memory stand-in for an ArangoDB deployment reachable under any host name.
///
/// Documents are shared by all hosts. Cursors and stream transactions live on
/// the host that created them, other hosts answer "not found" for them.
/// Writes of a stream transaction are visible only to requests of that
/// transaction until it commits.
///
/// Queries are not parsed. A cursor returns the documents of the collection
/// bound to `@value0`, or else the array bound to `value0`.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeArango {
    state: Arc<Mutex<ServerState>>,
}

impl FakeArango {
    pub(crate) fn new() -> Self {
        let server = FakeArango::default();
        server.create_database("_system");
        server
    }

    pub(crate) fn create_database(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .databases
            .entry(name.to_owned())
            .or_default();
    }

    pub(crate) fn set_endpoints(&self, endpoints: &[&str]) {
        self.state.lock().unwrap().endpoints = endpoints.iter().map(|e| e.to_string()).collect();
    }

    /// Makes connections to `host` fail until [`FakeArango::bring_up`].
    pub(crate) fn take_down(&self, host: &str) {
        self.state.lock().unwrap().down.insert(host.to_owned());
    }

    pub(crate) fn bring_up(&self, host: &str) {
        self.state.lock().unwrap().down.remove(host);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Host names of all requests received, including refused ones.
    pub(crate) fn hosts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.url.host_str().unwrap_or_default().to_owned())
            .collect()
    }

    pub(crate) fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    /// Committed documents of a collection, ordered by key.
    pub(crate) fn documents(&self, database: &str, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn open_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }
}

#[async_trait]
impl Transport for FakeArango {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let host = request.url.host_str().unwrap_or_default().to_owned();
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        if state.down.contains(&host) {
            return Err(TransportError::new(format!(
                "connection to {host} refused"
            )));
        }
        Ok(state.handle(&host, &request))
    }
}

fn error(code: u16, error_num: u32, message: &str) -> HttpResponse {
    HttpResponse::json(
        code,
        &json!({ "error": true, "code": code, "errorNum": error_num, "errorMessage": message }),
    )
}

fn collection_not_found() -> HttpResponse {
    error(404, 1203, "collection or view not found")
}

fn cursor_not_found() -> HttpResponse {
    error(404, 1600, "cursor not found")
}

fn transaction_not_found() -> HttpResponse {
    error(404, 1655, "transaction not found")
}

impl ServerState {
    fn handle(&mut self, host: &str, request: &HttpRequest) -> HttpResponse {
        let segments: Vec<&str> = request
            .url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let (database, rest) = match segments.as_slice() {
            ["_db", database, rest @ ..] => (database.to_string(), rest),
            rest => ("_system".to_owned(), rest),
        };
        if !self.databases.contains_key(&database) {
            return error(404, 1228, "database not found");
        }

        let trx = request.header("x-arango-trx-id");
        if let Some(id) = trx {
            let joinable = self
                .transactions
                .get(id)
                .is_some_and(|t| t.status == "running" && t.host == host);
            if !joinable && !matches!(rest, ["_api", "transaction", ..]) {
                return transaction_not_found();
            }
        }

        let body: Value = request
            .body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .unwrap_or(Value::Null);

        match (request.method.as_str(), rest) {
            ("GET", ["_api", "version"]) => HttpResponse::json(
                200,
                &json!({ "server": "arango", "version": "3.12.0", "license": "community" }),
            ),
            ("GET", ["_api", "cluster", "endpoints"]) => self.endpoints(),
            ("POST", ["_api", "collection"]) => self.create_collection(&database, &body),
            ("GET", ["_api", "collection", name]) => self.collection(&database, name),
            ("PUT", ["_api", "collection", name, "truncate"]) => {
                match self.collection_mut(&database, name) {
                    Some(documents) => {
                        documents.clear();
                        HttpResponse::json(200, &json!({ "name": name }))
                    }
                    None => collection_not_found(),
                }
            }
            ("DELETE", ["_api", "collection", name]) => {
                match self
                    .databases
                    .get_mut(&database)
                    .and_then(|collections| collections.remove(*name))
                {
                    Some(_) => HttpResponse::json(200, &json!({ "error": false })),
                    None => collection_not_found(),
                }
            }
            ("POST", ["_api", "document", collection]) => {
                self.insert(&database, collection, body, trx)
            }
            (method, ["_api", "document", collection, key]) => {
                self.document(method, &database, collection, key, body, trx)
            }
            ("POST", ["_api", "cursor"]) => self.create_cursor(host, &database, &body, trx),
            ("PUT", ["_api", "cursor", id]) => self.next_batch(host, id),
            ("DELETE", ["_api", "cursor", id]) => {
                if self.cursors.get(*id).is_some_and(|cursor| cursor.host == host) {
                    self.cursors.remove(*id);
                    HttpResponse::json(202, &json!({ "id": id, "error": false }))
                } else {
                    cursor_not_found()
                }
            }
            ("POST", ["_api", "transaction", "begin"]) => self.begin(host, &database),
            ("POST", ["_api", "transaction"]) => {
                HttpResponse::json(200, &json!({ "result": body["params"], "error": false }))
            }
            ("GET", ["_api", "transaction"]) => self.list_transactions(&database),
            ("GET", ["_api", "transaction", id]) => match self.transactions.get(*id) {
                Some(t) => HttpResponse::json(
                    200,
                    &json!({ "result": { "id": id, "status": t.status } }),
                ),
                None => transaction_not_found(),
            },
            ("PUT", ["_api", "transaction", id]) => self.finish(id, true),
            ("DELETE", ["_api", "transaction", id]) => self.finish(id, false),
            _ => error(404, 404, "unknown path"),
        }
    }

    fn endpoints(&self) -> HttpResponse {
        if self.endpoints.is_empty() {
            return error(403, 11, "only available in a cluster");
        }
        let endpoints: Vec<Value> = self
            .endpoints
            .iter()
            .map(|endpoint| json!({ "endpoint": endpoint }))
            .collect();
        HttpResponse::json(200, &json!({ "error": false, "endpoints": endpoints }))
    }

    fn collection_mut(&mut self, database: &str, name: &str) -> Option<&mut Documents> {
        self.databases.get_mut(database)?.get_mut(name)
    }

    fn create_collection(&mut self, database: &str, body: &Value) -> HttpResponse {
        let Some(name) = body["name"].as_str() else {
            return error(400, 1208, "illegal name");
        };
        let Some(collections) = self.databases.get_mut(database) else {
            return error(404, 1228, "database not found");
        };
        if collections.contains_key(name) {
            return error(409, 1207, "duplicate name");
        }
        collections.insert(name.to_owned(), Documents::new());
        HttpResponse::json(200, &json!({ "name": name, "type": 2, "status": 3 }))
    }

    fn collection(&self, database: &str, name: &str) -> HttpResponse {
        match self.databases.get(database).and_then(|c| c.get(name)) {
            Some(documents) => HttpResponse::json(
                200,
                &json!({ "name": name, "type": 2, "count": documents.len() }),
            ),
            None => collection_not_found(),
        }
    }

    /// Documents as seen by `trx`, or by requests outside of any transaction.
    fn visible(&self, database: &str, collection: &str, trx: Option<&str>) -> Option<Documents> {
        let mut documents = self.databases.get(database)?.get(collection)?.clone();
        if let Some(transaction) = trx.and_then(|id| self.transactions.get(id)) {
            for write in transaction
                .writes
                .iter()
                .filter(|w| w.collection == collection)
            {
                match &write.document {
                    Some(document) => documents.insert(write.key.clone(), document.clone()),
                    None => documents.remove(&write.key),
                };
            }
        }
        Some(documents)
    }

    fn write(&mut self, database: &str, write: StagedWrite, trx: Option<&str>) {
        if let Some(transaction) = trx.and_then(|id| self.transactions.get_mut(id)) {
            transaction.writes.push(write);
            return;
        }
        apply(&mut self.databases, database, write);
    }

    fn stamp(&mut self, collection: &str, key: &str, document: &mut Map<String, Value>) -> Value {
        self.next_id += 1;
        let meta = json!({
            "_id": format!("{collection}/{key}"),
            "_key": key,
            "_rev": format!("_r{}", self.next_id),
        });
        for field in ["_id", "_key", "_rev"] {
            document.insert(field.to_owned(), meta[field].clone());
        }
        meta
    }

    fn insert(
        &mut self,
        database: &str,
        collection: &str,
        body: Value,
        trx: Option<&str>,
    ) -> HttpResponse {
        let Some(documents) = self.visible(database, collection, trx) else {
            return collection_not_found();
        };
        let Value::Object(mut document) = body else {
            return error(400, 1227, "invalid document type");
        };
        let key = match document.get("_key").and_then(Value::as_str) {
            Some(key) => key.to_owned(),
            None => {
                self.next_id += 1;
                self.next_id.to_string()
            }
        };
        if documents.contains_key(&key) {
            return error(409, 1210, "unique constraint violated");
        }
        let meta = self.stamp(collection, &key, &mut document);
        let write = StagedWrite {
            collection: collection.to_owned(),
            key,
            document: Some(Value::Object(document)),
        };
        self.write(database, write, trx);
        HttpResponse::json(201, &meta)
    }

    fn document(
        &mut self,
        method: &str,
        database: &str,
        collection: &str,
        key: &str,
        body: Value,
        trx: Option<&str>,
    ) -> HttpResponse {
        let Some(documents) = self.visible(database, collection, trx) else {
            return collection_not_found();
        };
        let Some(current) = documents.get(key).cloned() else {
            return match method {
                "HEAD" => HttpResponse::new(404, ""),
                _ => error(404, 1202, "document not found"),
            };
        };
        match method {
            "GET" => HttpResponse::json(200, &current),
            "HEAD" => HttpResponse::new(200, ""),
            "PATCH" => {
                let mut merged = current.as_object().cloned().unwrap_or_default();
                if let Value::Object(patch) = body {
                    merged.extend(patch.into_iter().filter(|(field, _)| !field.starts_with('_')));
                }
                let meta = self.stamp(collection, key, &mut merged);
                let write = StagedWrite {
                    collection: collection.to_owned(),
                    key: key.to_owned(),
                    document: Some(Value::Object(merged)),
                };
                self.write(database, write, trx);
                HttpResponse::json(202, &meta)
            }
            "DELETE" => {
                let write = StagedWrite {
                    collection: collection.to_owned(),
                    key: key.to_owned(),
                    document: None,
                };
                self.write(database, write, trx);
                HttpResponse::json(
                    202,
                    &json!({ "_id": current["_id"], "_key": key, "_rev": current["_rev"] }),
                )
            }
            _ => error(405, 405, "method not supported"),
        }
    }

    fn create_cursor(
        &mut self,
        host: &str,
        database: &str,
        body: &Value,
        trx: Option<&str>,
    ) -> HttpResponse {
        let bind_vars = &body["bindVars"];
        let items: Vec<Value> = if let Some(collection) = bind_vars["@value0"].as_str() {
            match self.visible(database, collection, trx) {
                Some(documents) => documents.into_values().collect(),
                None => return collection_not_found(),
            }
        } else if let Some(items) = bind_vars["value0"].as_array() {
            items.clone()
        } else {
            Vec::new()
        };

        let total = items.len();
        let batch_size = body["batchSize"]
            .as_u64()
            .map_or(DEFAULT_BATCH_SIZE, |size| size as usize)
            .max(1);
        let mut remaining: VecDeque<Value> = items.into();
        let first = batch_size.min(remaining.len());
        let batch: Vec<Value> = remaining.drain(..first).collect();

        let mut response = json!({
            "result": batch,
            "hasMore": !remaining.is_empty(),
            "error": false,
            "code": 201,
            "extra": { "stats": { "scannedFull": total }, "warnings": [] },
        });
        if body["count"].as_bool() == Some(true) {
            response["count"] = json!(total);
        }
        if !remaining.is_empty() {
            self.next_id += 1;
            let id = self.next_id.to_string();
            response["id"] = json!(id);
            self.cursors.insert(
                id,
                ServerCursor {
                    host: host.to_owned(),
                    remaining,
                    batch_size,
                },
            );
        }
        HttpResponse::json(201, &response)
    }

    fn next_batch(&mut self, host: &str, id: &str) -> HttpResponse {
        let Some(cursor) = self.cursors.get_mut(id) else {
            return cursor_not_found();
        };
        if cursor.host != host {
            return cursor_not_found();
        }
        let size = cursor.batch_size.min(cursor.remaining.len());
        let batch: Vec<Value> = cursor.remaining.drain(..size).collect();
        let has_more = !cursor.remaining.is_empty();
        if !has_more {
            self.cursors.remove(id);
        }
        HttpResponse::json(
            200,
            &json!({ "id": id, "result": batch, "hasMore": has_more, "error": false }),
        )
    }

    fn begin(&mut self, host: &str, database: &str) -> HttpResponse {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.transactions.insert(
            id.clone(),
            ServerTransaction {
                database: database.to_owned(),
                host: host.to_owned(),
                status: "running",
                writes: Vec::new(),
            },
        );
        HttpResponse::json(201, &json!({ "result": { "id": id, "status": "running" } }))
    }

    fn list_transactions(&self, database: &str) -> HttpResponse {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .filter(|(_, t)| t.database == database && t.status == "running")
            .map(|(id, t)| json!({ "id": id, "state": t.status }))
            .collect();
        HttpResponse::json(200, &json!({ "transactions": transactions }))
    }

    /// Commits or aborts. Any host may finish a transaction.
    fn finish(&mut self, id: &str, commit: bool) -> HttpResponse {
        let Some(transaction) = self.transactions.get_mut(id) else {
            return transaction_not_found();
        };
        match (transaction.status, commit) {
            ("running", _) => {}
            ("committed", true) | ("aborted", false) => {
                return HttpResponse::json(
                    200,
                    &json!({ "result": { "id": id, "status": transaction.status } }),
                );
            }
            (status, _) => {
                return error(409, 1653, &format!("transaction already {status}"));
            }
        }

        transaction.status = if commit { "committed" } else { "aborted" };
        let status = transaction.status;
        let database = transaction.database.clone();
        let writes = std::mem::take(&mut transaction.writes);
        if commit {
            for write in writes {
                apply(&mut self.databases, &database, write);
            }
        }
        HttpResponse::json(200, &json!({ "result": { "id": id, "status": status } }))
    }
}

fn apply(
    databases: &mut HashMap<String, HashMap<String, Documents>>,
    database: &str,
    write: StagedWrite,
) {
    let Some(documents) = databases
        .get_mut(database)
        .and_then(|collections| collections.get_mut(&write.collection))
    else {
        return;
    };
    match write.document {
        Some(document) => {
            documents.insert(write.key, document);
        }
        None => {
            documents.remove(&write.key);
        }
    }
}
