pub mod memory;
pub mod ships;

use crate::{
    dao::{memory::MemoryShipDao, ships::ShipDao},
    model::{
        apperror::ApplicationError,
        models::{PaginationInput, Ship, ShipPage},
    },
    service::criteria::ShipCriteria,
};

/**
 * Persistence contract for ships.
 */
#[allow(async_fn_in_trait)]
pub trait ShipStore {
    /**
     * Inserts the ship when it has no id yet, otherwise overwrites the stored ship.
     *
     * # Returns
     * The stored ship, with its id assigned.
     */
    async fn save(&self, ship: Ship) -> Result<Ship, ApplicationError>;

    /**
     * Looks up a ship by id.
     */
    async fn find_by_id(&self, id: i64) -> Result<Option<Ship>, ApplicationError>;

    /**
     * Deletes a ship by id. Fails with `NotFound` if nothing was deleted.
     */
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError>;

    /**
     * Returns the requested page of ships matching the criteria, sorted ascending by the
     * requested field with ties broken by id, together with the total number of matches.
     */
    async fn find_by_criteria(&self, criteria: &ShipCriteria, pagination: &PaginationInput) -> Result<ShipPage, ApplicationError>;
}

/**
 * The store selected by the database configuration.
 */
pub enum ConfiguredShipStore {
    Postgresql(ShipDao),
    Memory(MemoryShipDao),
}

impl ShipStore for ConfiguredShipStore {
    async fn save(&self, ship: Ship) -> Result<Ship, ApplicationError> {
        match self {
            ConfiguredShipStore::Postgresql(dao) => dao.save(ship).await,
            ConfiguredShipStore::Memory(dao) => dao.save(ship).await,
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Ship>, ApplicationError> {
        match self {
            ConfiguredShipStore::Postgresql(dao) => dao.find_by_id(id).await,
            ConfiguredShipStore::Memory(dao) => dao.find_by_id(id).await,
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError> {
        match self {
            ConfiguredShipStore::Postgresql(dao) => dao.delete_by_id(id).await,
            ConfiguredShipStore::Memory(dao) => dao.delete_by_id(id).await,
        }
    }

    async fn find_by_criteria(&self, criteria: &ShipCriteria, pagination: &PaginationInput) -> Result<ShipPage, ApplicationError> {
        match self {
            ConfiguredShipStore::Postgresql(dao) => dao.find_by_criteria(criteria, pagination).await,
            ConfiguredShipStore::Memory(dao) => dao.find_by_criteria(criteria, pagination).await,
        }
    }
}
