use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::apperror::ApplicationError;

/**
 * Default page number when none is requested.
 */
pub const DEFAULT_PAGE_NUMBER: i64 = 0;

/**
 * Default page size when none is requested.
 */
pub const DEFAULT_PAGE_SIZE: i64 = 3;

/**
 * The kind of ship.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipType {
    Transport,
    Military,
    Merchant,
}

impl ShipType {
    /**
     * Name used on the wire and in the database.
     */
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipType::Transport => "TRANSPORT",
            ShipType::Military => "MILITARY",
            ShipType::Merchant => "MERCHANT",
        }
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShipType {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TRANSPORT" => Ok(ShipType::Transport),
            "MILITARY" => Ok(ShipType::Military),
            "MERCHANT" => Ok(ShipType::Merchant),
            other => Err(ApplicationError::validation(&format!("Unknown ship type {other}"))),
        }
    }
}

/**
 * Fields a ship listing can be sorted by. Sorting is always ascending.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipOrder {
    #[default]
    Id,
    Speed,
    Date,
    Rating,
}

impl ShipOrder {
    /**
     * The column in the ship table backing this ordering.
     */
    pub fn column(&self) -> &'static str {
        match self {
            ShipOrder::Id => "id",
            ShipOrder::Speed => "speed",
            ShipOrder::Date => "prod_date",
            ShipOrder::Rating => "rating",
        }
    }
}

/**
 * A ship as held by the store.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    /**
     * Assigned by the store on the first save.
     */
    pub id: Option<i64>,
    pub name: String,
    pub planet: String,
    pub ship_type: ShipType,
    pub prod_date: DateTime<Utc>,
    pub is_used: bool,
    /**
     * Speed, always rounded to two decimals.
     */
    pub speed: Decimal,
    pub crew_size: i32,
    /**
     * Derived from is_used, speed and the production year.
     */
    pub rating: Decimal,
}

/**
 * Sparse set of ship fields supplied by a create or update request.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipChanges {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub prod_date: Option<DateTime<Utc>>,
    pub is_used: Option<bool>,
    pub speed: Option<Decimal>,
    pub crew_size: Option<i32>,
}

impl ShipChanges {
    /**
     * True when the request did not supply a single updatable field.
     */
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.planet.is_none()
            && self.ship_type.is_none()
            && self.prod_date.is_none()
            && self.is_used.is_none()
            && self.speed.is_none()
            && self.crew_size.is_none()
    }
}

/**
 * Optional filters of a list or count request. Absent means not requested.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipFilterInput {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub is_used: Option<bool>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub min_speed: Option<Decimal>,
    pub max_speed: Option<Decimal>,
    pub min_crew_size: Option<i32>,
    pub max_crew_size: Option<i32>,
    pub min_rating: Option<Decimal>,
    pub max_rating: Option<Decimal>,
}

/**
 * Pagination and ordering of a listing.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginationInput {
    /**
     * Zero based page index.
     */
    pub page_number: i64,
    pub page_size: i64,
    pub order: ShipOrder,
}

impl Default for PaginationInput {
    fn default() -> Self {
        PaginationInput { page_number: DEFAULT_PAGE_NUMBER, page_size: DEFAULT_PAGE_SIZE, order: ShipOrder::default() }
    }
}

impl PaginationInput {
    /**
     * Validates the pagination input.
     *
     * # Returns
     * The input itself, or a validation error if the page number is negative or the page size is not positive.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.page_number < 0 {
            return Err(ApplicationError::validation("Page number cannot be negative"));
        }
        if self.page_size < 1 {
            return Err(ApplicationError::validation("Page size must be at least 1"));
        }
        Ok(self)
    }

    /**
     * Number of rows to skip before the requested page.
     */
    pub fn offset(&self) -> i64 {
        self.page_number.saturating_mul(self.page_size)
    }
}

/**
 * A page of ships together with the total number of matches.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ShipPage {
    pub ships: Vec<Ship>,
    pub total: i64,
}

impl ShipPage {
    pub fn new(ships: Vec<Ship>, total: i64) -> Self {
        ShipPage { ships, total }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ship_type_from_str() {
        assert_eq!(ShipType::from_str("MILITARY").unwrap(), ShipType::Military);
        assert_eq!(ShipType::from_str(ShipType::Merchant.as_str()).unwrap(), ShipType::Merchant);
        assert!(ShipType::from_str("military").is_err());
    }

    #[test]
    fn test_ship_type_serde_names() {
        assert_eq!(serde_json::to_string(&ShipType::Transport).unwrap(), "\"TRANSPORT\"");
        let order: ShipOrder = serde_json::from_str("\"DATE\"").unwrap();
        assert_eq!(order.column(), "prod_date");
    }

    #[test]
    fn test_pagination_validate() {
        assert!(PaginationInput::default().validate().is_ok());
        assert!(PaginationInput { page_number: -1, ..PaginationInput::default() }.validate().is_err());
        assert!(PaginationInput { page_size: 0, ..PaginationInput::default() }.validate().is_err());
    }

    #[test]
    fn test_pagination_offset() {
        let pagination = PaginationInput { page_number: 2, page_size: 3, order: ShipOrder::Id };
        assert_eq!(pagination.offset(), 6);
    }

    #[test]
    fn test_ship_changes_is_empty() {
        assert!(ShipChanges::default().is_empty());
        assert!(!ShipChanges { is_used: Some(false), ..ShipChanges::default() }.is_empty());
    }
}
