//! Bootstraps the schema an HR application expects and prints the report.
//! Run with DATABASE_URL pointing at a MySQL database.

use sqlboot::{
    ColumnDefault, ColumnSpec, ColumnType, DbConf, MySqlSession, SchemaBootstrapper, SeedSpec,
    SeedValue, SpecError,
};
use tracing_subscriber::EnvFilter;

fn hr_schema() -> Result<SchemaBootstrapper, SpecError> {
    let departments = sqlboot::TableSpec::with_id(
        "departments",
        vec![ColumnSpec::new(
            "name",
            ColumnType::VarChar { length: 100 },
        )],
    )
    .unique(&["name"]);

    let employees = sqlboot::TableSpec::with_id(
        "employees",
        vec![
            ColumnSpec::new("name", ColumnType::VarChar { length: 100 }),
            ColumnSpec::new("email", ColumnType::VarChar { length: 100 }),
            ColumnSpec::new("department_id", ColumnType::Integer).nullable(),
            ColumnSpec::new(
                "status",
                ColumnType::Enum {
                    values: vec![
                        "Active".to_string(),
                        "Inactive".to_string(),
                        "On Leave".to_string(),
                    ],
                },
            )
            .default_value(ColumnDefault::Text("Active".to_string())),
            ColumnSpec::new(
                "basic_salary",
                ColumnType::Decimal {
                    precision: 15,
                    scale: 2,
                },
            )
            .default_value(ColumnDefault::Float(0.0)),
            ColumnSpec::new("date_hired", ColumnType::Date).nullable(),
            ColumnSpec::new("updated_at", ColumnType::Timestamp { auto_update: true })
                .default_value(ColumnDefault::CurrentTimestamp),
        ],
    )
    .unique(&["email"])
    .foreign_key(&["department_id"], "departments", &["id"]);

    let hmo_plans = sqlboot::TableSpec::with_id(
        "hmo_plans",
        vec![
            ColumnSpec::new("provider", ColumnType::VarChar { length: 100 }),
            ColumnSpec::new("plan_name", ColumnType::VarChar { length: 100 }),
            ColumnSpec::new(
                "monthly_premium",
                ColumnType::Decimal {
                    precision: 10,
                    scale: 2,
                },
            )
            .default_value(ColumnDefault::Float(0.0)),
        ],
    );

    let department_seed = SeedSpec::new(
        "departments",
        &["name"],
        vec![
            vec![SeedValue::Text("Engineering".to_string())],
            vec![SeedValue::Text("Human Resources".to_string())],
            vec![SeedValue::Text("Finance".to_string())],
        ],
    );

    let hmo_seed = SeedSpec::new(
        "hmo_plans",
        &["provider", "plan_name", "monthly_premium"],
        vec![
            vec![
                SeedValue::Text("Maxicare".to_string()),
                SeedValue::Text("Gold".to_string()),
                SeedValue::Float(2500.0),
            ],
            vec![
                SeedValue::Text("Intellicare".to_string()),
                SeedValue::Text("Standard".to_string()),
                SeedValue::Float(1800.0),
            ],
        ],
    );

    SchemaBootstrapper::new(vec![departments, employees, hmo_plans])?
        .with_seeds(vec![department_seed, hmo_seed])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let conf = DbConf::from_env();
    let pool = conf.connect().await?;
    let mut session = MySqlSession::new(&pool);

    let report = hr_schema()?.ensure(&mut session).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
