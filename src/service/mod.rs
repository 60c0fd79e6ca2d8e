pub mod criteria;
pub mod ships;
