use actix_web::{
    HttpRequest, HttpResponse, delete, get, post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{ShipFilterQuery, ShipPageQuery, ShipRequest, ShipResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{PaginationInput, ShipChanges, ShipFilterInput},
    },
};

/**
 * Registers the ship endpoints. The count endpoint is registered before the
 * id lookup so that `/ships/count` is not taken for an id.
 */
pub fn configure(service_config: &mut web::ServiceConfig) {
    service_config.service(ships_list).service(ships_count).service(ship_get).service(ship_add).service(ship_update).service(ship_delete);
}

/**
 * Endpoint to retrieve a filtered, sorted page of ships.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listShips", trace_id = get_trace_id(&http_request), result))]
#[get("/ships")]
pub async fn ships_list(http_request: HttpRequest, filter: web::Query<ShipFilterQuery>, pagination: web::Query<ShipPageQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let filter_input = ShipFilterInput::try_from(filter.into_inner())?;
    let pagination_input = PaginationInput::from(pagination.into_inner()).validate()?;
    let ships = app_state.ship_service.get_ships(filter_input, pagination_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ships.into_iter().map(ShipResponse::from).collect::<Vec<ShipResponse>>()))
}

/**
 * Endpoint to count the ships matching a filter.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "countShips", trace_id = get_trace_id(&http_request), result))]
#[get("/ships/count")]
pub async fn ships_count(http_request: HttpRequest, filter: web::Query<ShipFilterQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let filter_input = ShipFilterInput::try_from(filter.into_inner())?;
    let count = app_state.ship_service.get_ship_count(filter_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(count))
}

/**
 * Endpoint to retrieve a single ship.
 */
#[instrument(skip(http_request, app_state), fields(service = "getShip", trace_id = get_trace_id(&http_request), result))]
#[get("/ships/{shipId}")]
pub async fn ship_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let ship = app_state.ship_service.get_ship(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ShipResponse::from(ship)))
}

/**
 * Endpoint to add a new ship.
 */
#[instrument(skip(http_request, app_state), fields(service = "addShip", trace_id = get_trace_id(&http_request), result))]
#[post("/ships")]
pub async fn ship_add(http_request: HttpRequest, request_body: web::Json<ShipRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let changes = ShipChanges::try_from(request_body.into_inner())?;
    let ship = app_state.ship_service.create_ship(changes).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ShipResponse::from(ship)))
}

/**
 * Endpoint to partially update a ship.
 */
#[instrument(skip(http_request, app_state), fields(service = "updateShip", trace_id = get_trace_id(&http_request), result))]
#[post("/ships/{shipId}")]
pub async fn ship_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ShipRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let changes = ShipChanges::try_from(request_body.into_inner())?;
    let ship = app_state.ship_service.update_ship(path.into_inner(), changes).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ShipResponse::from(ship)))
}

/**
 * Endpoint to delete a ship.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteShip", trace_id = get_trace_id(&http_request), result))]
#[delete("/ships/{shipId}")]
pub async fn ship_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.ship_service.delete_ship(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
