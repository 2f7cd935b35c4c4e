use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DbConf {
    pub database: String,

    pub max_connections: u32,
}

impl Default for DbConf {
    fn default() -> Self {
        Self {
            database: "mysql://localhost/sqlboot".to_string(),
            max_connections: 5,
        }
    }
}

impl DbConf {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        #[cfg(test)]
        {
            dotenvy::from_filename_override(".env.test").ok();
        }

        let database = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mysql://localhost/sqlboot".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        Self {
            database,
            max_connections,
        }
    }

    pub async fn connect(&self) -> Result<MySqlPool, sqlx::Error> {
        MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database)
            .await
    }
}
