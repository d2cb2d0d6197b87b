pub mod deal;
pub mod decision;
pub mod offer;
