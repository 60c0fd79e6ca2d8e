use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{Instrument, instrument};

use crate::{
    dao::ShipStore,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, Ship, ShipChanges, ShipFilterInput},
    },
    service::criteria::ShipCriteria,
};

/**
 * Maximum length of ship and planet names.
 */
const MAX_TEXT_LENGTH: usize = 50;

const MIN_PROD_YEAR: i32 = 2800;

/**
 * Last valid production year, also the reference year of the rating.
 */
const MAX_PROD_YEAR: i32 = 3019;

const MAX_CREW_SIZE: i32 = 9999;

/**
 * Slowest valid speed after rounding. Inclusive on create, exclusive on update.
 */
const MIN_SPEED: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/**
 * Fastest valid speed after rounding. Inclusive on create, exclusive on update.
 */
const MAX_SPEED: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/**
 * Represents the service for managing ships.
 */
pub struct ShipService<S: ShipStore> {
    /**
     * The store holding the ships.
     */
    ship_store: S,
}

impl<S: ShipStore> ShipService<S> {
    /**
     * Creates a new instance of `ShipService`.
     *
     * # Arguments
     * `ship_store`: The store holding the ships.
     *
     * # Returns
     * A new instance of `ShipService`.
     */
    pub fn new(ship_store: S) -> Self {
        ShipService { ship_store }
    }

    /**
     * Retrieves one page of ships matching the filter.
     *
     * # Arguments
     * `filter_input`: Optional filters requested by the caller.
     * `pagination_input`: Page, page size and ordering.
     *
     * # Returns
     * A Result containing the ships of the page or an `ApplicationError`.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_ships(&self, filter_input: ShipFilterInput, pagination_input: PaginationInput) -> Result<Vec<Ship>, ApplicationError> {
        let span = tracing::Span::current();
        let criteria = ShipCriteria::from(filter_input);
        let page = self.ship_store.find_by_criteria(&criteria, &pagination_input).instrument(span).await?;
        Ok(page.ships)
    }

    /**
     * Counts all ships matching the filter.
     *
     * # Arguments
     * `filter_input`: Optional filters requested by the caller.
     *
     * # Returns
     * A Result containing the number of matching ships or an `ApplicationError`.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_ship_count(&self, filter_input: ShipFilterInput) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let criteria = ShipCriteria::from(filter_input);
        let page = self.ship_store.find_by_criteria(&criteria, &PaginationInput::default()).instrument(span).await?;
        Ok(page.total)
    }

    /**
     * Retrieves a ship by its ID.
     *
     * # Arguments
     * `ship_id`: The ID of the ship.
     *
     * # Returns
     * The ship, a validation error for non-positive ids or a not found error.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn get_ship(&self, ship_id: i64) -> Result<Ship, ApplicationError> {
        let span = tracing::Span::current();
        validate_id(ship_id)?;
        self.ship_store.find_by_id(ship_id).instrument(span).await?.ok_or_else(ship_not_found)
    }

    /**
     * Validates and stores a new ship.
     *
     * # Arguments
     * `changes`: The supplied fields. All but `is_used` are required.
     *
     * # Returns
     * The stored ship with id and rating, or a validation error.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn create_ship(&self, changes: ShipChanges) -> Result<Ship, ApplicationError> {
        let span = tracing::Span::current();
        let (Some(name), Some(planet), Some(ship_type), Some(prod_date), Some(speed), Some(crew_size)) = (changes.name, changes.planet, changes.ship_type, changes.prod_date, changes.speed, changes.crew_size) else {
            return Err(ApplicationError::validation("Missing required ship field"));
        };
        let is_used = changes.is_used.unwrap_or(false);

        validate_text(&name, "name")?;
        validate_text(&planet, "planet")?;
        if !(0..=MAX_CREW_SIZE).contains(&crew_size) {
            return Err(ApplicationError::validation("Crew size out of range"));
        }
        let speed = round_two_decimals(speed);
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ApplicationError::validation("Speed out of range"));
        }
        validate_prod_date(&prod_date)?;

        let rating = calculate_rating(is_used, speed, prod_date.year());
        let ship = Ship { id: None, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating };
        let ship = self.ship_store.save(ship).instrument(span).await?;
        tracing::info!("Created ship {:?}", ship.id);
        Ok(ship)
    }

    /**
     * Applies a partial update to an existing ship and recomputes its rating.
     *
     * Every supplied field is validated before anything is stored, so a single invalid field leaves the ship untouched.
     * When no field is supplied the stored ship is returned as is.
     *
     * # Arguments
     * `ship_id`: The ID of the ship to update.
     * `changes`: The supplied fields.
     *
     * # Returns
     * The updated ship, a validation error or a not found error.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn update_ship(&self, ship_id: i64, changes: ShipChanges) -> Result<Ship, ApplicationError> {
        let span = tracing::Span::current();
        validate_id(ship_id)?;
        let mut ship = self.ship_store.find_by_id(ship_id).instrument(span.clone()).await?.ok_or_else(ship_not_found)?;
        if changes.is_empty() {
            return Ok(ship);
        }

        if let Some(name) = changes.name {
            validate_text(&name, "name")?;
            ship.name = name;
        }
        if let Some(planet) = changes.planet {
            validate_text(&planet, "planet")?;
            ship.planet = planet;
        }
        if let Some(speed) = changes.speed {
            let speed = round_two_decimals(speed);
            if speed <= MIN_SPEED || speed >= MAX_SPEED {
                return Err(ApplicationError::validation("Speed out of range"));
            }
            ship.speed = speed;
        }
        if let Some(crew_size) = changes.crew_size {
            if crew_size <= 0 || crew_size > MAX_CREW_SIZE {
                return Err(ApplicationError::validation("Crew size out of range"));
            }
            ship.crew_size = crew_size;
        }
        if let Some(ship_type) = changes.ship_type {
            ship.ship_type = ship_type;
        }
        if let Some(prod_date) = changes.prod_date {
            validate_prod_date(&prod_date)?;
            ship.prod_date = prod_date;
        }
        if let Some(is_used) = changes.is_used {
            ship.is_used = is_used;
        }

        ship.rating = calculate_rating(ship.is_used, ship.speed, ship.prod_date.year());
        self.ship_store.save(ship).instrument(span).await
    }

    /**
     * Deletes a ship by its ID.
     *
     * # Arguments
     * `ship_id`: The ID of the ship to delete.
     *
     * # Returns
     * A Result indicating success, a validation error or a not found error.
     */
    #[instrument(skip(self), fields(result))]
    pub async fn delete_ship(&self, ship_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        validate_id(ship_id)?;
        self.ship_store.find_by_id(ship_id).instrument(span.clone()).await?.ok_or_else(ship_not_found)?;
        self.ship_store.delete_by_id(ship_id).instrument(span).await
    }
}

/**
 * Rating of a ship: 80 * (0.5 if used, else 1) * speed / (3019 - production year + 1), rounded to two decimals.
 *
 * # Arguments
 * `is_used`: Whether the ship is used.
 * `speed`: The rounded speed.
 * `prod_year`: The production year, within the valid range.
 */
pub fn calculate_rating(is_used: bool, speed: Decimal, prod_year: i32) -> Decimal {
    let usage_factor = if is_used { Decimal::new(5, 1) } else { Decimal::ONE };
    let age = Decimal::from(MAX_PROD_YEAR - prod_year + 1);
    round_two_decimals(Decimal::from(80) * usage_factor * speed / age)
}

/**
 * Rounds half away from zero to two decimals.
 */
pub fn round_two_decimals(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn validate_id(ship_id: i64) -> Result<(), ApplicationError> {
    if ship_id <= 0 {
        return Err(ApplicationError::validation("Ship id must be positive"));
    }
    Ok(())
}

fn validate_text(value: &str, field: &str) -> Result<(), ApplicationError> {
    let length = value.chars().count();
    if length == 0 || length > MAX_TEXT_LENGTH {
        return Err(ApplicationError::validation(&format!("Ship {field} must be between 1 and {MAX_TEXT_LENGTH} characters")));
    }
    Ok(())
}

fn validate_prod_date(prod_date: &DateTime<Utc>) -> Result<(), ApplicationError> {
    if !(MIN_PROD_YEAR..=MAX_PROD_YEAR).contains(&prod_date.year()) {
        return Err(ApplicationError::validation("Production year out of range"));
    }
    Ok(())
}

fn ship_not_found() -> ApplicationError {
    ApplicationError::new(ErrorType::NotFound, "Ship not found".to_string())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;
    use crate::{
        dao::memory::MemoryShipDao,
        model::models::{ShipOrder, ShipType},
    };

    fn decimal(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn year(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).unwrap()
    }

    fn valid_changes() -> ShipChanges {
        ShipChanges {
            name: Some("Eagle".to_string()),
            planet: Some("Earth".to_string()),
            ship_type: Some(ShipType::Military),
            prod_date: Some(year(3000)),
            is_used: None,
            speed: Some(decimal("0.5")),
            crew_size: Some(100),
        }
    }

    fn service() -> ShipService<MemoryShipDao> {
        ShipService::new(MemoryShipDao::new())
    }

    #[test]
    fn test_calculate_rating() {
        assert_eq!(calculate_rating(false, decimal("0.5"), 3000), decimal("2"));
        assert_eq!(calculate_rating(true, decimal("0.5"), 3000), decimal("1"));
        assert_eq!(calculate_rating(false, decimal("0.99"), 3019), decimal("79.2"));
        assert_eq!(calculate_rating(true, decimal("0.99"), 2800), decimal("0.18"));
        assert_eq!(calculate_rating(false, decimal("0.33"), 3012), decimal("3.3"));
    }

    #[test]
    fn test_round_two_decimals() {
        assert_eq!(round_two_decimals(decimal("0.994")), decimal("0.99"));
        assert_eq!(round_two_decimals(decimal("0.995")), decimal("1.00"));
        assert_eq!(round_two_decimals(decimal("0.005")), decimal("0.01"));
    }

    #[tokio::test]
    async fn test_create_ship_rating() {
        let ship = service().create_ship(ShipChanges { is_used: Some(true), speed: Some(decimal("0.666")), ..valid_changes() }).await.unwrap();
        assert_eq!(ship.id, Some(1));
        assert_eq!(ship.speed, decimal("0.67"));
        assert_eq!(ship.rating, round_two_decimals(Decimal::from(80) * decimal("0.5") * decimal("0.67") / Decimal::from(20)));
        assert_eq!(ship.rating, decimal("1.34"));
    }

    #[tokio::test]
    async fn test_create_ship_defaults_is_used() {
        let ship = service().create_ship(valid_changes()).await.unwrap();
        assert!(!ship.is_used);
        assert_eq!(ship.rating, decimal("2"));
    }

    #[tokio::test]
    async fn test_create_ship_missing_field() {
        let service = service();
        for changes in [
            ShipChanges { name: None, ..valid_changes() },
            ShipChanges { planet: None, ..valid_changes() },
            ShipChanges { ship_type: None, ..valid_changes() },
            ShipChanges { prod_date: None, ..valid_changes() },
            ShipChanges { speed: None, ..valid_changes() },
            ShipChanges { crew_size: None, ..valid_changes() },
        ] {
            assert_eq!(service.create_ship(changes).await.unwrap_err().error_type, ErrorType::Validation);
        }
    }

    #[tokio::test]
    async fn test_create_ship_name_length() {
        let service = service();
        assert!(service.create_ship(ShipChanges { name: Some(String::new()), ..valid_changes() }).await.is_err());
        assert!(service.create_ship(ShipChanges { name: Some("x".repeat(50)), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { name: Some("x".repeat(51)), ..valid_changes() }).await.is_err());
        assert!(service.create_ship(ShipChanges { planet: Some(String::new()), ..valid_changes() }).await.is_err());
        assert!(service.create_ship(ShipChanges { planet: Some("p".repeat(51)), ..valid_changes() }).await.is_err());
    }

    #[tokio::test]
    async fn test_create_ship_speed_boundaries() {
        let service = service();
        assert_eq!(service.create_ship(ShipChanges { speed: Some(decimal("0.005")), ..valid_changes() }).await.unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(service.create_ship(ShipChanges { speed: Some(decimal("0.994")), ..valid_changes() }).await.unwrap().speed, decimal("0.99"));
        assert!(service.create_ship(ShipChanges { speed: Some(decimal("0.1")), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { speed: Some(decimal("0.995")), ..valid_changes() }).await.is_err());
    }

    #[tokio::test]
    async fn test_create_ship_crew_size_boundaries() {
        let service = service();
        assert!(service.create_ship(ShipChanges { crew_size: Some(0), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { crew_size: Some(9999), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { crew_size: Some(-1), ..valid_changes() }).await.is_err());
        assert!(service.create_ship(ShipChanges { crew_size: Some(10000), ..valid_changes() }).await.is_err());
    }

    #[tokio::test]
    async fn test_create_ship_year_boundaries() {
        let service = service();
        assert!(service.create_ship(ShipChanges { prod_date: Some(year(2799)), ..valid_changes() }).await.is_err());
        assert!(service.create_ship(ShipChanges { prod_date: Some(year(2800)), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { prod_date: Some(year(3019)), ..valid_changes() }).await.is_ok());
        assert!(service.create_ship(ShipChanges { prod_date: Some(year(3020)), ..valid_changes() }).await.is_err());
    }

    #[tokio::test]
    async fn test_update_speed_boundary_is_exclusive() {
        let service = service();
        let ship = service.create_ship(valid_changes()).await.unwrap();
        let ship_id = ship.id.unwrap();
        let result = service.update_ship(ship_id, ShipChanges { speed: Some(decimal("0.994")), ..ShipChanges::default() }).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
        assert!(service.update_ship(ship_id, ShipChanges { speed: Some(decimal("0.1")), ..ShipChanges::default() }).await.is_err());
        let updated = service.update_ship(ship_id, ShipChanges { speed: Some(decimal("0.98")), ..ShipChanges::default() }).await.unwrap();
        assert_eq!(updated.speed, decimal("0.98"));
        assert_eq!(updated.rating, calculate_rating(false, decimal("0.98"), 3000));
    }

    #[tokio::test]
    async fn test_update_crew_size_zero_rejected() {
        let service = service();
        let ship_id = service.create_ship(valid_changes()).await.unwrap().id.unwrap();
        assert!(service.update_ship(ship_id, ShipChanges { crew_size: Some(0), ..ShipChanges::default() }).await.is_err());
        assert!(service.update_ship(ship_id, ShipChanges { crew_size: Some(10000), ..ShipChanges::default() }).await.is_err());
        assert_eq!(service.update_ship(ship_id, ShipChanges { crew_size: Some(9999), ..ShipChanges::default() }).await.unwrap().crew_size, 9999);
    }

    #[tokio::test]
    async fn test_update_without_fields_is_noop() {
        let service = service();
        let ship = service.create_ship(valid_changes()).await.unwrap();
        let unchanged = service.update_ship(ship.id.unwrap(), ShipChanges::default()).await.unwrap();
        assert_eq!(unchanged, ship);
    }

    #[tokio::test]
    async fn test_update_crew_size_keeps_rating() {
        let service = service();
        let ship = service.create_ship(ShipChanges { is_used: Some(true), ..valid_changes() }).await.unwrap();
        let updated = service.update_ship(ship.id.unwrap(), ShipChanges { crew_size: Some(42), ..ShipChanges::default() }).await.unwrap();
        assert_eq!(updated.crew_size, 42);
        assert_eq!(updated.rating, ship.rating);
    }

    #[tokio::test]
    async fn test_update_recomputes_rating() {
        let service = service();
        let ship = service.create_ship(valid_changes()).await.unwrap();
        let updated = service.update_ship(ship.id.unwrap(), ShipChanges { is_used: Some(true), prod_date: Some(year(3010)), ..ShipChanges::default() }).await.unwrap();
        assert_eq!(updated.rating, decimal("2"));
        assert_eq!(service.get_ship(ship.id.unwrap()).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_failure_is_not_partially_applied() {
        let service = service();
        let ship = service.create_ship(valid_changes()).await.unwrap();
        let result = service.update_ship(ship.id.unwrap(), ShipChanges { name: Some("Renamed".to_string()), prod_date: Some(year(3020)), ..ShipChanges::default() }).await;
        assert!(result.is_err());
        assert_eq!(service.get_ship(ship.id.unwrap()).await.unwrap().name, "Eagle");
    }

    #[tokio::test]
    async fn test_update_unknown_and_invalid_id() {
        let service = service();
        assert_eq!(service.update_ship(5, valid_changes()).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.update_ship(0, valid_changes()).await.unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_get_deleted_and_invalid_id() {
        let service = service();
        let ship_id = service.create_ship(valid_changes()).await.unwrap().id.unwrap();
        service.delete_ship(ship_id).await.unwrap();
        assert_eq!(service.get_ship(ship_id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.get_ship(-1).await.unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(service.delete_ship(ship_id).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(service.delete_ship(-1).await.unwrap_err().error_type, ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_list_speed_range_and_name_intersection() {
        let service = service();
        for (name, speed) in [("Falcon", "0.5"), ("Falcon II", "0.95"), ("Hawk", "0.7"), ("Falcon III", "0.9"), ("Crow", "0.2")] {
            service.create_ship(ShipChanges { name: Some(name.to_string()), speed: Some(decimal(speed)), ..valid_changes() }).await.unwrap();
        }
        let pagination = PaginationInput { page_number: 0, page_size: 100, order: ShipOrder::Speed };
        let speed_filter = ShipFilterInput { min_speed: Some(decimal("0.5")), max_speed: Some(decimal("0.9")), ..ShipFilterInput::default() };
        let ships = service.get_ships(speed_filter.clone(), pagination).await.unwrap();
        let names: Vec<&str> = ships.iter().map(|ship| ship.name.as_str()).collect();
        assert_eq!(names, vec!["Falcon", "Hawk", "Falcon III"]);

        let intersection = ShipFilterInput { name: Some("Falcon".to_string()), ..speed_filter };
        let ships = service.get_ships(intersection, pagination).await.unwrap();
        let names: Vec<&str> = ships.iter().map(|ship| ship.name.as_str()).collect();
        assert_eq!(names, vec!["Falcon", "Falcon III"]);
    }

    #[tokio::test]
    async fn test_count_matches_unpaged_list() {
        let service = service();
        for (planet, is_used) in [("Mars", true), ("Mars", false), ("Venus", true), ("Marsala", true), ("Earth", true)] {
            service.create_ship(ShipChanges { planet: Some(planet.to_string()), is_used: Some(is_used), ..valid_changes() }).await.unwrap();
        }
        let filter = ShipFilterInput { planet: Some("Mars".to_string()), is_used: Some(true), ..ShipFilterInput::default() };
        let count = service.get_ship_count(filter.clone()).await.unwrap();
        let ships = service.get_ships(filter, PaginationInput { page_number: 0, page_size: 1000, order: ShipOrder::Id }).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(count, i64::try_from(ships.len()).unwrap());
    }

    #[tokio::test]
    async fn test_list_default_page_size() {
        let service = service();
        for _ in 0..5 {
            service.create_ship(valid_changes()).await.unwrap();
        }
        let ships = service.get_ships(ShipFilterInput::default(), PaginationInput::default()).await.unwrap();
        let ids: Vec<Option<i64>> = ships.iter().map(|ship| ship.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(service.get_ship_count(ShipFilterInput::default()).await.unwrap(), 5);
    }
}
