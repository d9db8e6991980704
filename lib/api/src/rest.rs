use crate::client::QueryParams;
use crate::explorer::{Explorer, NewNode, Outcome};
use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use txmap_core::{
    format_timestamp, format_token_value, Edge, Error, Network, Node, TimeZoneLabel,
};
use txmap_storage::snapshot::{checksum, decode, encode};
use txmap_storage::Tab;

const CHECKSUM_HEADER: &str = "x-checksum";

#[derive(Deserialize)]
struct SearchRequest {
    network: String,
    address: String,
    #[serde(default)]
    params: QueryParams,
}

#[derive(Deserialize)]
struct ZoomRequest {
    zoom: f64,
}

#[derive(Deserialize)]
struct DropRequest {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct ViewQuery {
    #[serde(default)]
    zone: TimeZoneLabel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgeView<'a> {
    #[serde(flatten)]
    edge: &'a Edge,
    value_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_label: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryView {
    pointer: isize,
    len: usize,
    can_undo: bool,
    can_redo: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphView<'a> {
    tab: &'a str,
    network: Network,
    zoom_level: f64,
    nodes: &'a [Node],
    edges: Vec<EdgeView<'a>>,
    history: HistoryView,
    #[serde(skip_serializing_if = "Option::is_none")]
    dragging: Option<&'a str>,
}

fn graph_view(tab: &Tab, zone: TimeZoneLabel) -> serde_json::Value {
    let store = tab.store();
    let history = store.history();
    let view = GraphView {
        tab: tab.id(),
        network: tab.network(),
        zoom_level: tab.zoom_level(),
        nodes: store.nodes(),
        edges: store
            .edges()
            .iter()
            .map(|edge| EdgeView {
                edge,
                value_label: format_token_value(edge.value, edge.token),
                time_label: edge.timestamp.and_then(|t| format_timestamp(t, zone)),
            })
            .collect(),
        history: HistoryView {
            pointer: history.pointer(),
            len: history.len(),
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
        },
        dragging: store.dragging(),
    };
    serde_json::to_value(view).unwrap_or_default()
}

fn error_response(error: &Error) -> HttpResponse {
    let body = serde_json::json!({ "error": error.to_string() });
    match error {
        Error::InvalidInput(_)
        | Error::TabLimitReached(_)
        | Error::UnsupportedNetwork(_)
        | Error::MissingPosition(_)
        | Error::Snapshot(_)
        | Error::Serialization(_) => HttpResponse::BadRequest().json(body),
        Error::TabNotFound(_) | Error::NodeNotFound(_) => HttpResponse::NotFound().json(body),
        Error::Service(_) => HttpResponse::BadGateway().json(body),
        Error::NoData(notice) => HttpResponse::Ok().json(serde_json::json!({ "notice": notice })),
        Error::Io(_) => HttpResponse::InternalServerError().json(body),
    }
}

fn outcome_response(explorer: &Explorer, tab_id: &str, outcome: Outcome) -> HttpResponse {
    let graph = explorer
        .tabs()
        .get_tab(tab_id)
        .map(|handle| graph_view(&handle.read(), TimeZoneLabel::default()));
    HttpResponse::Ok().json(serde_json::json!({
        "outcome": outcome,
        "graph": graph,
    }))
}

pub struct RestApi;

impl RestApi {
    pub async fn start(explorer: Arc<Explorer>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(explorer.clone()))
                .configure(Self::routes)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Route table, shared with tests.
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/search", web::post().to(search))
            .route("/recent", web::get().to(recent_searches))
            .route("/recent/{term}", web::delete().to(forget_search))
            .route("/undo", web::post().to(undo_active))
            .route("/redo", web::post().to(redo_active))
            .route("/tabs", web::get().to(list_tabs))
            .route("/tabs/import", web::post().to(import_tab))
            .route("/tabs/{tab}", web::get().to(get_tab))
            .route("/tabs/{tab}", web::delete().to(close_tab))
            .route("/tabs/{tab}/active", web::put().to(activate_tab))
            .route("/tabs/{tab}/reset", web::post().to(reset_tab))
            .route("/tabs/{tab}/zoom", web::put().to(set_zoom))
            .route("/tabs/{tab}/undo", web::post().to(undo))
            .route("/tabs/{tab}/redo", web::post().to(redo))
            .route("/tabs/{tab}/export", web::get().to(export_tab))
            .route("/tabs/{tab}/snapshots", web::get().to(list_snapshots))
            .route("/tabs/{tab}/snapshots", web::post().to(save_snapshot))
            .route("/tabs/{tab}/snapshots/{name}", web::post().to(restore_snapshot))
            .route("/tabs/{tab}/snapshots/{name}", web::delete().to(delete_snapshot))
            .route("/tabs/{tab}/drag/cancel", web::post().to(cancel_drag))
            .route("/tabs/{tab}/transactions/{tx}", web::get().to(transaction_detail))
            .route("/tabs/{tab}/nodes/{node}", web::delete().to(delete_node))
            .route("/tabs/{tab}/nodes/{node}/expand", web::post().to(expand))
            .route("/tabs/{tab}/nodes/{node}/children", web::post().to(add_node))
            .route("/tabs/{tab}/nodes/{node}/drag", web::post().to(begin_drag))
            .route("/tabs/{tab}/nodes/{node}/drop", web::post().to(end_drag));
    }
}

async fn search(
    explorer: web::Data<Arc<Explorer>>,
    req: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let req = req.into_inner();
    let network: Network = match req.network.parse() {
        Ok(network) => network,
        Err(e) => return Ok(error_response(&e)),
    };
    let address = req.address.trim().to_string();
    match explorer.search(network, &address, &req.params).await {
        Ok(outcome) => Ok(outcome_response(&explorer, &address, outcome)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn recent_searches(explorer: web::Data<Arc<Explorer>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(explorer.tabs().recent_searches()))
}

async fn forget_search(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let removed = explorer.tabs().remove_recent_search(&path.into_inner());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed })))
}

async fn undo_active(explorer: web::Data<Arc<Explorer>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "applied": explorer.undo_active() })))
}

async fn redo_active(explorer: web::Data<Arc<Explorer>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "applied": explorer.redo_active() })))
}

async fn list_tabs(explorer: web::Data<Arc<Explorer>>) -> ActixResult<HttpResponse> {
    let tabs = explorer.tabs();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tabs": tabs.list_tabs(),
        "active": tabs.active_tab(),
    })))
}

async fn get_tab(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
    query: web::Query<ViewQuery>,
) -> ActixResult<HttpResponse> {
    let tab_id = path.into_inner();
    match explorer.tabs().get_tab(&tab_id) {
        Some(handle) => Ok(HttpResponse::Ok().json(graph_view(&handle.read(), query.zone))),
        None => Ok(error_response(&Error::TabNotFound(tab_id))),
    }
}

async fn close_tab(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let tab_id = path.into_inner();
    if explorer.tabs().remove_tab(&tab_id) {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "closed": tab_id })))
    } else {
        Ok(error_response(&Error::TabNotFound(tab_id)))
    }
}

async fn activate_tab(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.tabs().set_active(&path.into_inner()) {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn reset_tab(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.tabs().reset_tab(&path.into_inner()) {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn set_zoom(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
    req: web::Json<ZoomRequest>,
) -> ActixResult<HttpResponse> {
    match explorer.tabs().set_zoom(&path.into_inner(), req.zoom) {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn undo(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.undo(&path.into_inner()) {
        Ok(applied) => Ok(HttpResponse::Ok().json(serde_json::json!({ "applied": applied }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn redo(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.redo(&path.into_inner()) {
        Ok(applied) => Ok(HttpResponse::Ok().json(serde_json::json!({ "applied": applied }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn export_tab(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let data = match explorer.tabs().snapshot_data(&path.into_inner()) {
        Ok(data) => data,
        Err(e) => return Ok(error_response(&e)),
    };
    match encode(&data) {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type("application/gzip")
            .insert_header((CHECKSUM_HEADER, checksum(&bytes)))
            .body(bytes)),
        Err(e) => Ok(error_response(&Error::Snapshot(e.to_string()))),
    }
}

async fn import_tab(
    explorer: web::Data<Arc<Explorer>>,
    http_req: HttpRequest,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let expected = http_req
        .headers()
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let data = match decode(&body, expected.as_deref()) {
        Ok(data) => data,
        Err(e) => return Ok(error_response(&Error::Snapshot(e.to_string()))),
    };
    match explorer.tabs().restore(data) {
        Ok(handle) => Ok(HttpResponse::Ok().json(graph_view(&handle.read(), TimeZoneLabel::default()))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn list_snapshots(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.tabs().list_snapshots(&path.into_inner()) {
        Ok(snapshots) => Ok(HttpResponse::Ok().json(snapshots)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn save_snapshot(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.tabs().save_snapshot(&path.into_inner()) {
        Ok(description) => Ok(HttpResponse::Ok().json(description)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn restore_snapshot(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (tab_id, name) = path.into_inner();
    match explorer.tabs().load_snapshot(&tab_id, &name) {
        Ok(handle) => Ok(HttpResponse::Ok().json(graph_view(&handle.read(), TimeZoneLabel::default()))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn delete_snapshot(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (tab_id, name) = path.into_inner();
    match explorer.tabs().delete_snapshot(&tab_id, &name) {
        Ok(deleted) => Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn cancel_drag(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match explorer.cancel_drag(&path.into_inner()) {
        Ok(cancelled) => Ok(HttpResponse::Ok().json(serde_json::json!({ "cancelled": cancelled }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn transaction_detail(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (tab_id, tx_id) = path.into_inner();
    match explorer.transaction_detail(&tab_id, &tx_id).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(detail)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn delete_node(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (tab_id, node_id) = path.into_inner();
    match explorer.delete_node(&tab_id, &node_id) {
        Ok(removed) => Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn expand(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
    params: Option<web::Json<QueryParams>>,
) -> ActixResult<HttpResponse> {
    let (tab_id, node_id) = path.into_inner();
    let params = params.map(|p| p.into_inner()).unwrap_or_default();
    match explorer.expand(&tab_id, &node_id, &params).await {
        Ok(outcome) => Ok(outcome_response(&explorer, &tab_id, outcome)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn add_node(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
    req: web::Json<NewNode>,
) -> ActixResult<HttpResponse> {
    let (tab_id, node_id) = path.into_inner();
    match explorer.add_node(&tab_id, &node_id, req.into_inner()) {
        Ok(outcome) => Ok(outcome_response(&explorer, &tab_id, outcome)),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn begin_drag(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
) -> ActixResult<HttpResponse> {
    let (tab_id, node_id) = path.into_inner();
    match explorer.begin_drag(&tab_id, &node_id) {
        Ok(position) => Ok(HttpResponse::Ok().json(serde_json::json!({ "lifted": position }))),
        Err(e) => Ok(error_response(&e)),
    }
}

async fn end_drag(
    explorer: web::Data<Arc<Explorer>>,
    path: web::Path<(String, String)>,
    req: web::Json<DropRequest>,
) -> ActixResult<HttpResponse> {
    let (tab_id, node_id) = path.into_inner();
    match explorer.end_drag(&tab_id, &node_id, req.x, req.y) {
        Ok(position) => Ok(HttpResponse::Ok().json(serde_json::json!({ "position": position }))),
        Err(e) => Ok(error_response(&e)),
    }
}
