/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: schema migrations embedded from `migrations/`
///
/// Models live in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
