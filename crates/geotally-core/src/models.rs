pub mod assignment;
pub mod crs;
pub mod point;
pub mod region;

pub use assignment::{Assignment, AssignmentMethod, AssignmentTable, TieBreak};
pub use crs::Crs;
pub use point::{PointTable, StorePoint};
pub use region::{normalize_key, Region, RegionTable};
