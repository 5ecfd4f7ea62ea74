pub mod marketplace;
pub mod sync;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}
