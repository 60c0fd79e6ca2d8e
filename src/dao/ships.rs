use std::{borrow::Cow, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, postgres::PgArguments, query::QueryAs};
use tracing::{Instrument, instrument};

use crate::{
    dao::ShipStore,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, Ship, ShipOrder, ShipPage, ShipType},
    },
    service::criteria::ShipCriteria,
};

/**
 * Database response type for querying ships.
 */
pub type QueryShipDbResp = (i64, String, String, String, DateTime<Utc>, bool, Decimal, i32, Decimal);

/**
 * Columns selected for every ship query, in the order of `QueryShipDbResp`.
 */
const SHIP_COLUMNS: &str = "id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating";

/**
 * Filter shared by the list and count queries. Optional predicates are skipped when their parameter is NULL,
 * ranges are always applied.
 */
const SHIP_FILTER: &str = "($1::text IS NULL OR strpos(name, $1) > 0) AND
                           ($2::text IS NULL OR strpos(planet, $2) > 0) AND
                           ($3::text IS NULL OR ship_type = $3) AND
                           ($4::boolean IS NULL OR is_used = $4) AND
                           ($5::timestamptz IS NULL OR prod_date >= $5) AND
                           ($6::timestamptz IS NULL OR prod_date <= $6) AND
                           speed BETWEEN $7 AND $8 AND
                           crew_size BETWEEN $9 AND $10 AND
                           rating BETWEEN $11 AND $12";

/**
 * SQL query to retrieve a single ship.
 */
const QUERY_SHIP: &str = "SELECT id, name, planet, ship_type, prod_date, is_used, speed, crew_size, rating FROM ship WHERE id = $1";

/**
 * SQL query to add a new ship. The id comes from the table sequence.
 */
const ADD_SHIP: &str = "INSERT INTO ship (name, planet, ship_type, prod_date, is_used, speed, crew_size, rating) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id";

/**
 * SQL query to overwrite an existing ship.
 */
const UPDATE_SHIP: &str = "UPDATE ship SET name = $1, planet = $2, ship_type = $3, prod_date = $4, is_used = $5, speed = $6, crew_size = $7, rating = $8 WHERE id = $9";

/**
* SQL query to delete a ship.
*/
const DELETE_SHIP: &str = "DELETE FROM ship WHERE id = $1";

/**
 * Postgres backed ship store.
 */
pub struct ShipDao {
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Postgres>,
}

impl ShipDao {
    /**
     * Creates a new instance of `ShipDao`.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     *
     * # Returns
     * A new instance of `ShipDao`.
     */
    pub fn new(connection_pool: Pool<Postgres>) -> Self {
        ShipDao { connection_pool }
    }

    /**
     * Inserts a ship and returns it with the id assigned by the database.
     */
    #[instrument(skip(self, ship), fields(result))]
    async fn add_ship(&self, ship: Ship) -> Result<Ship, ApplicationError> {
        let span = tracing::Span::current();
        let next_id: (i64,) = sqlx::query_as(ADD_SHIP)
            .bind(&ship.name)
            .bind(&ship.planet)
            .bind(ship.ship_type.as_str())
            .bind(ship.prod_date)
            .bind(ship.is_used)
            .bind(ship.speed)
            .bind(ship.crew_size)
            .bind(ship.rating)
            .fetch_one(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        Ok(Ship { id: Some(next_id.0), ..ship })
    }

    /**
     * Overwrites all columns of an existing ship.
     */
    #[instrument(skip(self, ship), fields(result))]
    async fn update_ship(&self, ship_id: i64, ship: Ship) -> Result<Ship, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_SHIP)
            .bind(&ship.name)
            .bind(&ship.planet)
            .bind(ship.ship_type.as_str())
            .bind(ship.prod_date)
            .bind(ship.is_used)
            .bind(ship.speed)
            .bind(ship.crew_size)
            .bind(ship.rating)
            .bind(ship_id)
            .execute(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(err.as_database_error()))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Ship with id {} not found for update", ship_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Ship not found".to_string()));
        }
        Ok(ship)
    }

    /**
     * Builds the paginated list query for the requested ordering.
     */
    fn list_query(order: ShipOrder) -> String {
        format!("SELECT {SHIP_COLUMNS} FROM ship WHERE {SHIP_FILTER} ORDER BY {}, id LIMIT $13 OFFSET $14", order.column())
    }

    /**
     * Builds the count query.
     */
    fn count_query() -> String {
        format!("SELECT COUNT(*) FROM ship WHERE {SHIP_FILTER}")
    }

    /**
     * Binds the twelve filter parameters shared by the list and count queries.
     */
    fn bind_criteria<'q, O>(query: QueryAs<'q, Postgres, O, PgArguments>, criteria: &'q ShipCriteria) -> QueryAs<'q, Postgres, O, PgArguments> {
        query
            .bind(criteria.name.as_deref())
            .bind(criteria.planet.as_deref())
            .bind(criteria.ship_type.map(|ship_type| ship_type.as_str()))
            .bind(criteria.is_used)
            .bind(criteria.after)
            .bind(criteria.before)
            .bind(criteria.min_speed)
            .bind(criteria.max_speed)
            .bind(criteria.min_crew_size)
            .bind(criteria.max_crew_size)
            .bind(criteria.min_rating)
            .bind(criteria.max_rating)
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The database error to handle.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
        if let Some(db_error) = error {
            tracing::debug!("Database error: {}", db_error);
            if db_error.code() == Some(Cow::Borrowed("22001")) {
                // Value too long
                return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
            } else if db_error.code() == Some(Cow::Borrowed("23514")) {
                // Check violation
                return ApplicationError::new(ErrorType::Validation, "Value out of range".to_string());
            }
            tracing::error!("Unhandled database error: {}", db_error);
            return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
        }
        ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
    }
}

impl ShipStore for ShipDao {
    async fn save(&self, ship: Ship) -> Result<Ship, ApplicationError> {
        match ship.id {
            Some(ship_id) => self.update_ship(ship_id, ship).await,
            None => self.add_ship(ship).await,
        }
    }

    #[instrument(skip(self), fields(result))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Ship>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryShipDbResp> = sqlx::query_as(QUERY_SHIP)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get ship: {err}")))?;
        result.map(Ship::try_from).transpose()
    }

    #[instrument(skip(self), fields(result))]
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_SHIP)
            .bind(id)
            .execute(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete ship: {err}")))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Ship with ID {} not found for deletion", id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Ship not found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple ships deleted for ID {}", id);
            return Err(ApplicationError::new(ErrorType::Application, "Multiple ships deleted".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(result))]
    async fn find_by_criteria(&self, criteria: &ShipCriteria, pagination: &PaginationInput) -> Result<ShipPage, ApplicationError> {
        let span = tracing::Span::current();
        let list_query = Self::list_query(pagination.order);
        let results: Vec<QueryShipDbResp> = Self::bind_criteria(sqlx::query_as(&list_query), criteria)
            .bind(pagination.page_size)
            .bind(pagination.offset())
            .fetch_all(&self.connection_pool)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for ship list: {err}")))?;
        let count_query = Self::count_query();
        let total: (i64,) = Self::bind_criteria(sqlx::query_as(&count_query), criteria)
            .fetch_one(&self.connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for ship count: {err}")))?;
        let ships = results.into_iter().map(Ship::try_from).collect::<Result<Vec<Ship>, ApplicationError>>()?;
        Ok(ShipPage::new(ships, total.0))
    }
}

impl TryFrom<QueryShipDbResp> for Ship {
    type Error = ApplicationError;

    fn try_from(row: QueryShipDbResp) -> Result<Self, Self::Error> {
        let ship_type = ShipType::from_str(&row.3).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Stored ship has invalid type: {err}")))?;
        Ok(Ship { id: Some(row.0), name: row.1, planet: row.2, ship_type, prod_date: row.4, is_used: row.5, speed: row.6, crew_size: row.7, rating: row.8 })
    }
}
