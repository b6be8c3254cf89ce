pub mod refine;
pub mod units;

pub use self::refine::{RefineReport, RefineStatus, Refiner, SwapRecord};
pub use self::units::{Objective, Swap, UnitIndex};
