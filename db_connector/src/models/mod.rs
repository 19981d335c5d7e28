pub mod recoveries;
pub mod users;
