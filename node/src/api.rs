//! # JSON-RPC + REST + WebSocket API
//!
//! Builds the axum router that exposes the ledger over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                 | Description                          |
//! |--------|----------------------|--------------------------------------|
//! | GET    | `/health`            | Liveness probe                       |
//! | GET    | `/status`            | Ledger summary, proxy record, audit  |
//! | POST   | `/rpc`               | JSON-RPC 2.0 gateway                 |
//! | GET    | `/ws`                | Live stream of committed events      |
//! | GET    | `/accounts/:address` | Balance, deposits and native balance |
//!
//! ## Amounts
//!
//! Amounts always leave the node as decimal strings of base units. On the
//! way in, an amount may be a string or a JSON integer; a `units` param of
//! `"token"` or `"ether"` scales a decimal string such as `"0.5"` by 18
//! decimals, the default `"base"` takes it as-is.
//!
//! ## Callers
//!
//! Write methods take the acting account from the `from` param and trust
//! it as given: the API does no authentication. Bind it to a loopback or
//! otherwise private interface.
//!
//! `dev_fund` mints native value out of nothing. It only answers when the
//! node was started with `--dev`; otherwise it reports method not found.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use luigi_protocol::config::{NATIVE_DECIMALS, TOKEN_DECIMALS};
use luigi_protocol::units::parse_units;
use luigi_protocol::{Address, LedgerEvent, RecordedEvent};

use crate::service::{LedgerService, LedgerSnapshot, Receipt, ServiceError, UpgradeError};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// When the API came up.
    pub started_at: DateTime<Utc>,
    /// The ledger itself.
    pub service: Arc<LedgerService>,
    /// Enables the `dev_fund` faucet.
    pub dev_mode: bool,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/accounts/:address", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Method parameters (positional or named).
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description. For ledger rejections this
    /// is the reason string.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Ledger rejected the call.
pub const CODE_REJECTED: i32 = -32000;
/// Nothing has been deployed yet.
pub const CODE_NOT_DEPLOYED: i32 = -32002;
pub const CODE_INVALID_REQUEST: i32 = -32600;
pub const CODE_METHOD_NOT_FOUND: i32 = -32601;
pub const CODE_INVALID_PARAMS: i32 = -32602;
pub const CODE_INTERNAL: i32 = -32603;

impl JsonRpcError {
    fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self {
            code: CODE_INVALID_PARAMS,
            message: format!("Invalid params: {}", detail),
            data: None,
        }
    }
}

impl From<ServiceError> for JsonRpcError {
    fn from(err: ServiceError) -> Self {
        let code = match &err {
            ServiceError::NotDeployed | ServiceError::Upgrade(UpgradeError::NotDeployed) => {
                CODE_NOT_DEPLOYED
            }
            ServiceError::Storage(_) => CODE_INTERNAL,
            _ => CODE_REJECTED,
        };
        Self {
            code,
            message: err.to_string(),
            data: Some(json!({ "kind": err.kind() })),
        }
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Scale applied to incoming amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Base,
    Token,
    Ether,
}

impl Units {
    fn decimals(self) -> u8 {
        match self {
            Units::Base => 0,
            Units::Token => TOKEN_DECIMALS,
            Units::Ether => NATIVE_DECIMALS,
        }
    }
}

/// An amount as sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountParam {
    Text(String),
    Integer(u64),
}

impl AmountParam {
    fn resolve(&self, units: Units) -> Result<u128, JsonRpcError> {
        match self {
            AmountParam::Text(text) => {
                parse_units(text, units.decimals()).map_err(JsonRpcError::invalid_params)
            }
            AmountParam::Integer(n) => parse_units(&n.to_string(), units.decimals())
                .map_err(JsonRpcError::invalid_params),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddressParams {
    address: Address,
}

#[derive(Debug, Deserialize)]
struct CallerParams {
    from: Address,
}

#[derive(Debug, Deserialize)]
struct MoveParams {
    from: Address,
    to: Address,
    amount: AmountParam,
    #[serde(default)]
    units: Units,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnershipParams {
    from: Address,
    new_owner: Address,
}

#[derive(Debug, Deserialize)]
struct ValueParams {
    from: Address,
    #[serde(alias = "value")]
    amount: AmountParam,
    #[serde(default)]
    units: Units,
}

#[derive(Debug, Deserialize)]
struct FundParams {
    account: Address,
    #[serde(alias = "value")]
    amount: AmountParam,
    #[serde(default)]
    units: Units,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsParams {
    #[serde(default)]
    from_seq: u64,
    #[serde(default = "default_event_limit")]
    limit: usize,
}

fn default_event_limit() -> usize {
    100
}

/// Decodes named (`{...}`) or positional (`[...]`) params into `T`.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(JsonRpcError::invalid_params)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Seconds since the API came up.
    pub uptime_seconds: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
    /// The ledger as of this request.
    pub ledger: LedgerSnapshot,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Renders a logged event the way RPC clients and WebSocket subscribers see
/// it: `seq`, `kind`, the event's fields, amounts as decimal strings.
pub fn event_json(recorded: &RecordedEvent) -> Value {
    let mut body = match &recorded.event {
        LedgerEvent::Transfer { from, to, amount } => json!({
            "from": from,
            "to": to,
            "amount": amount.to_string(),
        }),
        LedgerEvent::Paused { account } | LedgerEvent::Unpaused { account } => {
            json!({ "account": account })
        }
        LedgerEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        } => json!({
            "previousOwner": previous_owner,
            "newOwner": new_owner,
        }),
        LedgerEvent::EtherDeposited { account, amount }
        | LedgerEvent::EtherWithdrawn { account, amount } => json!({
            "account": account,
            "amount": amount.to_string(),
        }),
    };
    body["seq"] = json!(recorded.seq);
    body["kind"] = json!(recorded.event.kind());
    body
}

fn receipt_json(receipt: &Receipt) -> Value {
    json!({ "events": receipt.events.iter().map(event_json).collect::<Vec<_>>() })
}

fn status_response(state: &AppState) -> Result<StatusResponse, ServiceError> {
    let now = Utc::now();
    Ok(StatusResponse {
        version: state.version.clone(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
        ledger: state.service.snapshot()?,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 while the process is up.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`: ledger summary, proxy record and invariant audit.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    match status_response(&state) {
        Ok(resp) => (StatusCode::OK, Json(json!(resp))).into_response(),
        Err(e) => {
            tracing::error!("status read failed: {}", e);
            let err = ErrorResponse {
                error: format!("Database error: {}", e),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!(err))).into_response()
        }
    }
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: CODE_INVALID_REQUEST,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(err) => {
            tracing::debug!(method = %req.method, code = err.code, "rpc error: {}", err.message);
            (None, Some(err))
        }
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// Routes one JSON-RPC method to the ledger service.
fn dispatch(state: &AppState, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let svc = &state.service;
    let value = match method {
        // -- Reads --
        "name" => json!(svc.read(|l| l.name())),
        "symbol" => json!(svc.read(|l| l.symbol())),
        "decimals" => json!(svc.read(|l| l.decimals())),
        "totalSupply" => json!(svc.read(|l| l.total_supply()).to_string()),
        "maxSupply" => json!(svc.read(|l| l.max_supply()).to_string()),
        "paused" => json!(svc.read(|l| l.paused())),
        "owner" => json!(svc.read(|l| l.owner())),
        "custodyBalance" => json!(svc.read(|l| l.custody_balance()).to_string()),
        "balanceOf" => {
            let p: AddressParams = parse_params(params)?;
            json!(svc.read(|l| l.balance_of(&p.address)).to_string())
        }
        "etherDeposits" => {
            let p: AddressParams = parse_params(params)?;
            json!(svc.read(|l| l.ether_deposits(&p.address)).to_string())
        }
        "nativeBalance" => {
            let p: AddressParams = parse_params(params)?;
            json!(svc.read(|l| l.host().balance_of(&p.address)).to_string())
        }

        // -- Writes --
        "mint" => {
            let p: MoveParams = parse_params(params)?;
            receipt_json(&svc.mint(p.from, p.to, p.amount.resolve(p.units)?)?)
        }
        "transfer" => {
            let p: MoveParams = parse_params(params)?;
            receipt_json(&svc.transfer(p.from, p.to, p.amount.resolve(p.units)?)?)
        }
        "pause" => {
            let p: CallerParams = parse_params(params)?;
            receipt_json(&svc.pause(p.from)?)
        }
        "unpause" => {
            let p: CallerParams = parse_params(params)?;
            receipt_json(&svc.unpause(p.from)?)
        }
        "renounceOwnership" => {
            let p: CallerParams = parse_params(params)?;
            receipt_json(&svc.renounce_ownership(p.from)?)
        }
        "transferOwnership" => {
            let p: OwnershipParams = parse_params(params)?;
            receipt_json(&svc.transfer_ownership(p.from, p.new_owner)?)
        }
        "depositEther" => {
            let p: ValueParams = parse_params(params)?;
            receipt_json(&svc.deposit_ether(p.from, p.amount.resolve(p.units)?)?)
        }
        "withdrawEther" => {
            let p: ValueParams = parse_params(params)?;
            receipt_json(&svc.withdraw_ether(p.from, p.amount.resolve(p.units)?)?)
        }
        "dev_fund" if state.dev_mode => {
            let p: FundParams = parse_params(params)?;
            let balance = svc.fund(p.account, p.amount.resolve(p.units)?)?;
            json!({ "account": p.account, "nativeBalance": balance.to_string() })
        }

        // -- Node --
        "luigi_audit" => match svc.audit() {
            Ok(()) => json!({ "ok": true }),
            Err(violation) => json!({ "ok": false, "violation": violation.to_string() }),
        },
        "luigi_events" => {
            let p: EventsParams = match params {
                None => EventsParams {
                    limit: default_event_limit(),
                    ..EventsParams::default()
                },
                some => parse_params(some)?,
            };
            let events = svc.events_since(p.from_seq, p.limit)?;
            json!(events.iter().map(event_json).collect::<Vec<_>>())
        }
        "luigi_version" => json!(state.version),
        "luigi_status" => json!(status_response(state)?),

        _ => {
            return Err(JsonRpcError {
                code: CODE_METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
                data: None,
            })
        }
    };
    Ok(value)
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive one JSON message per committed event, shaped by
/// [`event_json`]. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.service.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(recorded) => {
                        let payload = event_json(&recorded).to_string();
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

/// `GET /accounts/:address`: balance, deposits and native balance.
///
/// Unknown accounts read as zero; a malformed address is a 400.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match address.parse::<Address>() {
        Ok(address) => (StatusCode::OK, Json(json!(state.service.account(address)))).into_response(),
        Err(e) => {
            let err = ErrorResponse {
                error: format!("Invalid address {}: {}", address, e),
            };
            (StatusCode::BAD_REQUEST, Json(json!(err))).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LedgerMetrics;
    use crate::service::AccountView;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use luigi_contracts::LedgerParams;
    use luigi_protocol::config::{INITIAL_SUPPLY, ONE_ETHER, ONE_TOKEN};
    use luigi_protocol::storage::LedgerDB;
    use tower::ServiceExt;

    fn owner() -> Address {
        Address::from_label("owner")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    /// Creates a test AppState backed by a temporary database.
    fn test_app_state() -> AppState {
        let db = LedgerDB::open_temporary().expect("temp db");
        let metrics = Arc::new(LedgerMetrics::new().expect("metrics"));
        let service = LedgerService::open(db, metrics).expect("service");

        AppState {
            version: "0.1.0-test".into(),
            started_at: Utc::now(),
            service: Arc::new(service),
            dev_mode: true,
        }
    }

    /// Creates a test AppState with the reference deployment owned by `owner()`.
    fn deployed_app_state() -> AppState {
        let state = test_app_state();
        state
            .service
            .deploy(owner(), owner(), LedgerParams::default())
            .expect("deploy");
        state
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Calls one RPC method and returns the decoded response.
    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let rpc_body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let (status, body) = post_json(router, "/rpc", rpc_body).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_endpoint_reports_deployment() {
        let router = create_router(deployed_app_state());
        let (status, body) = get(&router, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["version"], "0.1.0-test");
        assert_eq!(json["ledger"]["deployed"], true);
        assert_eq!(json["ledger"]["symbol"], "UHC");
        assert_eq!(json["ledger"]["totalSupply"], INITIAL_SUPPLY.to_string());
        assert_eq!(json["ledger"]["logicVersion"], 1);
        assert_eq!(json["ledger"]["auditFailure"], Value::Null);
    }

    #[tokio::test]
    async fn reads_return_metadata_and_balances() {
        let router = create_router(deployed_app_state());

        assert_eq!(rpc(&router, "name", json!([])).await.result.unwrap(), "LuigiCoin");
        assert_eq!(rpc(&router, "decimals", json!([])).await.result.unwrap(), 18);
        assert_eq!(
            rpc(&router, "maxSupply", json!([])).await.result.unwrap(),
            (2_000_000 * ONE_TOKEN).to_string()
        );
        assert_eq!(
            rpc(&router, "owner", json!([])).await.result.unwrap(),
            owner().to_hex()
        );

        // Positional and named params are both accepted.
        let positional = rpc(&router, "balanceOf", json!([owner().to_hex()])).await;
        let named = rpc(&router, "balanceOf", json!({ "address": owner().to_hex() })).await;
        assert_eq!(positional.result.unwrap(), INITIAL_SUPPLY.to_string());
        assert_eq!(named.result.unwrap(), INITIAL_SUPPLY.to_string());
    }

    #[tokio::test]
    async fn transfer_with_token_units() {
        let router = create_router(deployed_app_state());
        let resp = rpc(
            &router,
            "transfer",
            json!({ "from": owner(), "to": bob(), "amount": "2.5", "units": "token" }),
        )
        .await;
        assert!(resp.error.is_none());

        let events = &resp.result.unwrap()["events"];
        assert_eq!(events[0]["kind"], "Transfer");
        assert_eq!(events[0]["seq"], 2);
        assert_eq!(events[0]["amount"], (5 * ONE_TOKEN / 2).to_string());

        let balance = rpc(&router, "balanceOf", json!([bob()])).await;
        assert_eq!(balance.result.unwrap(), (5 * ONE_TOKEN / 2).to_string());
    }

    #[tokio::test]
    async fn rejection_carries_reason_and_kind() {
        let router = create_router(deployed_app_state());
        rpc(&router, "pause", json!({ "from": owner() })).await;

        let resp = rpc(
            &router,
            "transfer",
            json!({ "from": owner(), "to": bob(), "amount": 1 }),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, CODE_REJECTED);
        assert_eq!(err.message, "Pausable: paused");
        assert_eq!(err.data.unwrap()["kind"], "ContractPaused");

        let resp = rpc(&router, "mint", json!({ "from": bob(), "to": bob(), "amount": "1" })).await;
        assert_eq!(resp.error.unwrap().message, "Ownable: caller is not the owner");
    }

    #[tokio::test]
    async fn writes_before_deploy_are_refused() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "pause", json!({ "from": owner() })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, CODE_NOT_DEPLOYED);
        assert_eq!(err.data.unwrap()["kind"], "NotDeployed");
    }

    #[tokio::test]
    async fn fund_deposit_and_withdraw() {
        let router = create_router(deployed_app_state());

        let funded = rpc(
            &router,
            "dev_fund",
            json!({ "account": bob(), "value": "2", "units": "ether" }),
        )
        .await;
        assert_eq!(
            funded.result.unwrap()["nativeBalance"],
            (2 * ONE_ETHER).to_string()
        );

        let deposit = rpc(
            &router,
            "depositEther",
            json!({ "from": bob(), "value": "1", "units": "ether" }),
        )
        .await;
        assert_eq!(deposit.result.unwrap()["events"][0]["kind"], "EtherDeposited");

        let withdraw = rpc(
            &router,
            "withdrawEther",
            json!({ "from": bob(), "amount": "0.25", "units": "ether" }),
        )
        .await;
        assert!(withdraw.error.is_none());

        let (status, body) = get(&router, &format!("/accounts/{}", bob())).await;
        assert_eq!(status, StatusCode::OK);
        let view: AccountView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.ether_deposits, 3 * ONE_ETHER / 4);
        assert_eq!(view.native_balance, 5 * ONE_ETHER / 4);
        assert_eq!(
            rpc(&router, "custodyBalance", json!([])).await.result.unwrap(),
            (3 * ONE_ETHER / 4).to_string()
        );

        let audit = rpc(&router, "luigi_audit", json!([])).await;
        assert_eq!(audit.result.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn faucet_requires_dev_mode() {
        let mut state = deployed_app_state();
        state.dev_mode = false;
        let router = create_router(state.clone());

        let resp = rpc(&router, "dev_fund", json!({ "account": bob(), "value": "1" })).await;
        assert_eq!(resp.error.unwrap().code, CODE_METHOD_NOT_FOUND);
        assert_eq!(state.service.account(bob()).native_balance, 0);
    }

    #[tokio::test]
    async fn zero_deposit_is_rejected() {
        let router = create_router(deployed_app_state());
        let resp = rpc(&router, "depositEther", json!({ "from": bob(), "value": "0" })).await;
        let err = resp.error.unwrap();
        assert_eq!(err.message, "No Ether sent");
        assert_eq!(err.data.unwrap()["kind"], "ZeroValue");
    }

    #[tokio::test]
    async fn ownership_transfer_and_renounce() {
        let router = create_router(deployed_app_state());
        let resp = rpc(
            &router,
            "transferOwnership",
            json!({ "from": owner(), "newOwner": bob() }),
        )
        .await;
        assert_eq!(resp.result.unwrap()["events"][0]["newOwner"], bob().to_hex());

        let resp = rpc(&router, "renounceOwnership", json!({ "from": bob() })).await;
        assert!(resp.error.is_none());
        assert_eq!(
            rpc(&router, "owner", json!([])).await.result.unwrap(),
            Address::ZERO.to_hex()
        );
    }

    #[tokio::test]
    async fn events_query_pages_the_log() {
        let router = create_router(deployed_app_state());
        rpc(&router, "pause", json!({ "from": owner() })).await;

        let all = rpc(&router, "luigi_events", json!({})).await.result.unwrap();
        let kinds: Vec<&str> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["OwnershipTransferred", "Transfer", "Paused"]);

        let tail = rpc(&router, "luigi_events", json!({ "fromSeq": 2, "limit": 5 }))
            .await
            .result
            .unwrap();
        assert_eq!(tail.as_array().unwrap().len(), 1);
        assert_eq!(tail[0]["account"], owner().to_hex());
    }

    #[tokio::test]
    async fn bad_params_and_methods() {
        let router = create_router(deployed_app_state());

        let resp = rpc(&router, "balanceOf", json!(["0x1234"])).await;
        assert_eq!(resp.error.unwrap().code, CODE_INVALID_PARAMS);

        let resp = rpc(
            &router,
            "transfer",
            json!({ "from": owner(), "to": bob(), "amount": "1.5" }),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, CODE_INVALID_PARAMS);

        let resp = rpc(&router, "eth_blockNumber", json!([])).await;
        assert_eq!(resp.error.unwrap().code, CODE_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn rpc_invalid_version_returns_error() {
        let router = create_router(test_app_state());
        let rpc_body = json!({
            "jsonrpc": "1.0",
            "method": "name",
            "params": [],
            "id": 20
        });
        let (_, body) = post_json(&router, "/rpc", rpc_body).await;
        let resp: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.error.unwrap().code, CODE_INVALID_REQUEST);
    }

    #[tokio::test]
    async fn account_endpoint_rejects_malformed_address() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/accounts/not-an-address").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("Invalid address"));
    }

    #[tokio::test]
    async fn account_endpoint_reads_zero_for_unknown() {
        let router = create_router(deployed_app_state());
        let stranger = Address::from_label("stranger");
        let (status, body) = get(&router, &format!("/accounts/{}", stranger)).await;

        assert_eq!(status, StatusCode::OK);
        let view: AccountView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.address, stranger);
        assert_eq!(view.balance, 0);
        assert_eq!(view.ether_deposits, 0);
    }
}
