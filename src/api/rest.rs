use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, PaginationInput, Ship, ShipChanges, ShipFilterInput, ShipOrder, ShipType},
};

/***************** Ships:list and count models *********************/

/**
 * Filter query parameters shared by the list and count endpoints.
 *
 * Every parameter is optional. Parameters not listed here are ignored.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipFilterQuery {
    /**
     * Substring of the ship name.
     */
    pub name: Option<String>,
    /**
     * Substring of the planet.
     */
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    /**
     * Earliest production date, epoch milliseconds.
     */
    pub after: Option<i64>,
    /**
     * Latest production date, epoch milliseconds.
     */
    pub before: Option<i64>,
    pub is_used: Option<bool>,
    pub min_speed: Option<Decimal>,
    pub max_speed: Option<Decimal>,
    pub min_crew_size: Option<i32>,
    pub max_crew_size: Option<i32>,
    pub min_rating: Option<Decimal>,
    pub max_rating: Option<Decimal>,
}

impl TryFrom<ShipFilterQuery> for ShipFilterInput {
    type Error = ApplicationError;

    fn try_from(query: ShipFilterQuery) -> Result<Self, Self::Error> {
        Ok(ShipFilterInput {
            name: query.name,
            planet: query.planet,
            ship_type: query.ship_type,
            is_used: query.is_used,
            after: query.after.map(from_epoch_millis).transpose()?,
            before: query.before.map(from_epoch_millis).transpose()?,
            min_speed: query.min_speed,
            max_speed: query.max_speed,
            min_crew_size: query.min_crew_size,
            max_crew_size: query.max_crew_size,
            min_rating: query.min_rating,
            max_rating: query.max_rating,
        })
    }
}

/**
 * Pagination and ordering query parameters for the list endpoint.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipPageQuery {
    /**
     * Field to sort by, ascending.
     */
    pub order: Option<ShipOrder>,
    /**
     * Zero based page index.
     */
    pub page_number: Option<i64>,
    /**
     * The size of the page to return.
     */
    pub page_size: Option<i64>,
}

impl From<ShipPageQuery> for PaginationInput {
    fn from(query: ShipPageQuery) -> Self {
        PaginationInput {
            page_number: query.page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
            page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            order: query.order.unwrap_or_default(),
        }
    }
}

/***************** Ships:add and update models *********************/

/**
 * Request body for creating or updating a ship.
 *
 * Absent fields are left untouched on update. An `id` or `rating` in the body is ignored.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipRequest {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    /**
     * Production date, epoch milliseconds.
     */
    pub prod_date: Option<i64>,
    pub is_used: Option<bool>,
    pub speed: Option<Decimal>,
    pub crew_size: Option<i32>,
}

impl TryFrom<ShipRequest> for ShipChanges {
    type Error = ApplicationError;

    fn try_from(request: ShipRequest) -> Result<Self, Self::Error> {
        Ok(ShipChanges {
            name: request.name,
            planet: request.planet,
            ship_type: request.ship_type,
            prod_date: request.prod_date.map(from_epoch_millis).transpose()?,
            is_used: request.is_used,
            speed: request.speed,
            crew_size: request.crew_size,
        })
    }
}

/**
 * A ship as returned by the API.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipResponse {
    pub id: Option<i64>,
    pub name: String,
    pub planet: String,
    pub ship_type: ShipType,
    /**
     * Production date, epoch milliseconds.
     */
    pub prod_date: i64,
    pub is_used: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub speed: Decimal,
    pub crew_size: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub rating: Decimal,
}

impl From<Ship> for ShipResponse {
    fn from(ship: Ship) -> Self {
        ShipResponse {
            id: ship.id,
            name: ship.name,
            planet: ship.planet,
            ship_type: ship.ship_type,
            prod_date: ship.prod_date.timestamp_millis(),
            is_used: ship.is_used,
            speed: ship.speed,
            crew_size: ship.crew_size,
            rating: ship.rating,
        }
    }
}

/**
 * Converts epoch milliseconds to a UTC timestamp.
 */
fn from_epoch_millis(millis: i64) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| ApplicationError::validation("Timestamp out of range"))
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::Application => 1005,
    }
}
