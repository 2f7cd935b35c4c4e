mod bootstrap;
mod conf;
mod ddl;
mod errors;
mod report;
mod session;
mod spec;
pub mod testing;

pub use bootstrap::SchemaBootstrapper;
pub use conf::DbConf;
pub use errors::{BootstrapError, DbError};
pub use report::{ApplyReport, ColumnAddition, SeedOutcome, TableState};
pub use session::{MySqlSession, SchemaSession};
pub use spec::{
    ColumnDefault, ColumnSpec, ColumnType, ForeignKey, SeedSpec, SeedValue, SpecError, TableSpec,
};
