use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::model::models::{Ship, ShipFilterInput, ShipType};

/**
 * Lower speed bound when no minSpeed is requested.
 */
pub const DEFAULT_MIN_SPEED: Decimal = Decimal::ZERO;

/**
 * Upper speed bound when no maxSpeed is requested.
 */
pub const DEFAULT_MAX_SPEED: Decimal = Decimal::ONE;

pub const DEFAULT_MIN_CREW_SIZE: i32 = 0;
pub const DEFAULT_MAX_CREW_SIZE: i32 = 10000;

pub const DEFAULT_MIN_RATING: Decimal = Decimal::ZERO;
pub const DEFAULT_MAX_RATING: Decimal = Decimal::MAX;

/**
 * Fully defaulted filter handed to the ship store.
 *
 * The four optional predicates (name, planet, ship type, used) are applied only when set.
 * The production date bounds are open when unset. Speed, crew size and rating ranges are always applied.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ShipCriteria {
    /**
     * Literal substring the name must contain.
     */
    pub name: Option<String>,
    /**
     * Literal substring the planet must contain.
     */
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub is_used: Option<bool>,
    /**
     * Inclusive lower bound on the production date.
     */
    pub after: Option<DateTime<Utc>>,
    /**
     * Inclusive upper bound on the production date.
     */
    pub before: Option<DateTime<Utc>>,
    pub min_speed: Decimal,
    pub max_speed: Decimal,
    pub min_crew_size: i32,
    pub max_crew_size: i32,
    pub min_rating: Decimal,
    pub max_rating: Decimal,
}

impl Default for ShipCriteria {
    fn default() -> Self {
        ShipCriteria::from(ShipFilterInput::default())
    }
}

impl From<ShipFilterInput> for ShipCriteria {
    fn from(input: ShipFilterInput) -> Self {
        ShipCriteria {
            name: input.name,
            planet: input.planet,
            ship_type: input.ship_type,
            is_used: input.is_used,
            after: input.after,
            before: input.before,
            min_speed: input.min_speed.unwrap_or(DEFAULT_MIN_SPEED),
            max_speed: input.max_speed.unwrap_or(DEFAULT_MAX_SPEED),
            min_crew_size: input.min_crew_size.unwrap_or(DEFAULT_MIN_CREW_SIZE),
            max_crew_size: input.max_crew_size.unwrap_or(DEFAULT_MAX_CREW_SIZE),
            min_rating: input.min_rating.unwrap_or(DEFAULT_MIN_RATING),
            max_rating: input.max_rating.unwrap_or(DEFAULT_MAX_RATING),
        }
    }
}

impl ShipCriteria {
    /**
     * Evaluates the criteria against a single ship. Used by stores that filter in process;
     * the Postgres store expresses the same predicates in SQL.
     *
     * # Arguments
     * `ship`: The ship to test.
     *
     * # Returns
     * True if the ship satisfies every applied predicate.
     */
    pub fn matches(&self, ship: &Ship) -> bool {
        self.name.as_ref().is_none_or(|name| ship.name.contains(name.as_str()))
            && self.planet.as_ref().is_none_or(|planet| ship.planet.contains(planet.as_str()))
            && self.ship_type.is_none_or(|ship_type| ship.ship_type == ship_type)
            && self.is_used.is_none_or(|is_used| ship.is_used == is_used)
            && self.after.is_none_or(|after| ship.prod_date >= after)
            && self.before.is_none_or(|before| ship.prod_date <= before)
            && (self.min_speed..=self.max_speed).contains(&ship.speed)
            && (self.min_crew_size..=self.max_crew_size).contains(&ship.crew_size)
            && (self.min_rating..=self.max_rating).contains(&ship.rating)
    }
}
