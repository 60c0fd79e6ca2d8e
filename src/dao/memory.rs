use std::{cmp::Ordering, collections::BTreeMap};

use tokio::sync::RwLock;
use tracing::instrument;

use crate::{
    dao::ShipStore,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PaginationInput, Ship, ShipOrder, ShipPage},
    },
    service::criteria::ShipCriteria,
};

/**
 * In-process ship store. Used for local runs without a database and for tests.
 */
#[derive(Default)]
pub struct MemoryShipDao {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    ships: BTreeMap<i64, Ship>,
    last_id: i64,
}

impl MemoryShipDao {
    pub fn new() -> Self {
        MemoryShipDao::default()
    }

    /**
     * Ascending comparison on the requested field, ties broken by id.
     */
    fn compare(order: ShipOrder, left: &Ship, right: &Ship) -> Ordering {
        let primary = match order {
            ShipOrder::Id => Ordering::Equal,
            ShipOrder::Speed => left.speed.cmp(&right.speed),
            ShipOrder::Date => left.prod_date.cmp(&right.prod_date),
            ShipOrder::Rating => left.rating.cmp(&right.rating),
        };
        primary.then_with(|| left.id.cmp(&right.id))
    }
}

impl ShipStore for MemoryShipDao {
    #[instrument(skip(self, ship))]
    async fn save(&self, ship: Ship) -> Result<Ship, ApplicationError> {
        let mut state = self.state.write().await;
        let ship_id = match ship.id {
            Some(ship_id) if state.ships.contains_key(&ship_id) => ship_id,
            Some(ship_id) => {
                tracing::debug!("Ship with id {} not found for update", ship_id);
                return Err(ApplicationError::new(ErrorType::NotFound, "Ship not found".to_string()));
            }
            None => {
                state.last_id += 1;
                state.last_id
            }
        };
        let ship = Ship { id: Some(ship_id), ..ship };
        state.ships.insert(ship_id, ship.clone());
        Ok(ship)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Ship>, ApplicationError> {
        Ok(self.state.read().await.ships.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), ApplicationError> {
        match self.state.write().await.ships.remove(&id) {
            Some(_) => Ok(()),
            None => {
                tracing::debug!("Ship with ID {} not found for deletion", id);
                Err(ApplicationError::new(ErrorType::NotFound, "Ship not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_by_criteria(&self, criteria: &ShipCriteria, pagination: &PaginationInput) -> Result<ShipPage, ApplicationError> {
        let state = self.state.read().await;
        let mut matching: Vec<&Ship> = state.ships.values().filter(|ship| criteria.matches(ship)).collect();
        matching.sort_by(|left, right| Self::compare(pagination.order, left, right));
        let total = i64::try_from(matching.len()).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to count ships: {err}")))?;
        let offset = usize::try_from(pagination.offset()).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid page offset: {err}")))?;
        let page_size = usize::try_from(pagination.page_size).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid page size: {err}")))?;
        let ships = matching.into_iter().skip(offset).take(page_size).cloned().collect();
        Ok(ShipPage::new(ships, total))
    }
}
