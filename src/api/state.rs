use crate::{dao::ConfiguredShipStore, service::ships::ShipService};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The ship service for handling ship-related operations.
     */
    pub ship_service: ShipService<ConfiguredShipStore>,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `ship_service`: The ship service for handling ship-related operations.
 */
impl AppState {
    pub fn new(ship_service: ShipService<ConfiguredShipStore>) -> Self {
        AppState { ship_service }
    }
}
