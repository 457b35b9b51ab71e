#![allow(dead_code)]

use futures_util::future::BoxFuture;
use sqlmapper::config::{CacheConfig, EvictionPolicy, PoolConfig};
use sqlmapper::db::Connection;
use sqlmapper::models::ExecuteResult;
use sqlmapper::statement::{ResultMap, StatementDescriptor};
use sqlmapper::{
    Configuration, ConnectionParams, Driver, EnvironmentConfig, MapperConfig, MapperResult, Row,
    SqliteDriver, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

sqlmapper::record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Employee {
        pub employee_id: i64,
        pub first_name: String,
        pub last_name: String,
        pub email: Option<String>,
        pub department_id: i64,
    }
}

impl Employee {
    pub fn new(first_name: &str, last_name: &str, department_id: i64) -> Self {
        Self {
            employee_id: 0,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: None,
            department_id,
        }
    }
}

const SCHEMA: &str = "CREATE TABLE EMPLOYEES (
    EMPLOYEE_ID INTEGER PRIMARY KEY,
    FIRST_NAME TEXT NOT NULL,
    LAST_NAME TEXT NOT NULL,
    EMAIL TEXT,
    DEPARTMENT_ID INTEGER NOT NULL
)";

const SEED: &[(i64, &str, &str, Option<&str>, i64)] = &[
    (100, "Steven", "King", Some("SKING"), 90),
    (101, "Neena", "Kochhar", None, 90),
    (542, "Ada", "Lovelace", Some("ALOVELACE"), 60),
];

/// A SQLite database file that lives as long as the value.
pub struct TestDb {
    _file: NamedTempFile,
    pub url: String,
}

impl TestDb {
    pub async fn new() -> Self {
        let file = NamedTempFile::new().unwrap();
        let url = format!("sqlite:{}?mode=rwc", file.path().to_str().unwrap());

        let mut conn = SqliteDriver::new()
            .connect(&ConnectionParams::new(url.clone()))
            .await
            .unwrap();
        conn.execute(SCHEMA, &[], false).await.unwrap();
        for (id, first, last, email, department) in SEED {
            let params = vec![
                Value::Int(*id),
                Value::Text(first.to_string()),
                Value::Text(last.to_string()),
                email.map(|e| Value::Text(e.to_string())).unwrap_or(Value::Null),
                Value::Int(*department),
            ];
            conn.execute(
                "INSERT INTO EMPLOYEES VALUES (?, ?, ?, ?, ?)",
                &params,
                false,
            )
            .await
            .unwrap();
        }

        Self { _file: file, url }
    }
}

/// Wraps the SQLite driver and counts statements sent to the database.
#[derive(Default)]
pub struct CountingDriver {
    inner: SqliteDriver,
    pub queries: Arc<AtomicUsize>,
    pub writes: Arc<AtomicUsize>,
}

impl CountingDriver {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

struct CountingConnection {
    inner: Box<dyn Connection>,
    queries: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl Driver for CountingDriver {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectionParams,
    ) -> BoxFuture<'a, MapperResult<Box<dyn Connection>>> {
        Box::pin(async move {
            let inner = self.inner.connect(params).await?;
            Ok(Box::new(CountingConnection {
                inner,
                queries: Arc::clone(&self.queries),
                writes: Arc::clone(&self.writes),
            }) as Box<dyn Connection>)
        })
    }
}

impl Connection for CountingConnection {
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, MapperResult<Vec<Row>>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(sql, params)
    }

    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
        return_keys: bool,
    ) -> BoxFuture<'a, MapperResult<ExecuteResult>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, params, return_keys)
    }

    fn ping(&mut self) -> BoxFuture<'_, MapperResult<()>> {
        self.inner.ping()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

pub fn employee_mapper(policy: EvictionPolicy) -> MapperConfig {
    MapperConfig::new("EmployeeMapper")
        .with_cache(CacheConfig::new(policy, 32, Duration::from_secs(3600)))
        .with_result_map(
            ResultMap::new("employeeSummary", "Employee")
                .with_id_mapping("EMP_NO", "employeeId")
                .with_mapping("GIVEN", "firstName")
                .with_mapping("FAMILY", "lastName")
                .with_mapping("DEPT", "departmentId"),
        )
        .with_statement(
            StatementDescriptor::select(
                "getEmployeeById",
                "SELECT * FROM EMPLOYEES WHERE EMPLOYEE_ID = #{employeeId}",
            )
            .with_parameter_type("long")
            .with_result_type("com.example.Employee")
            .cacheable(),
        )
        .with_statement(
            StatementDescriptor::select(
                "getAllEmployees",
                "SELECT * FROM EMPLOYEES ORDER BY EMPLOYEE_ID",
            )
            .with_result_type("Employee")
            .cacheable(),
        )
        .with_statement(
            StatementDescriptor::select(
                "getEmployeesByDepartment",
                "SELECT * FROM EMPLOYEES WHERE DEPARTMENT_ID = #{departmentId} ORDER BY EMPLOYEE_ID",
            )
            .with_parameter_type("long")
            .with_result_type("Employee"),
        )
        .with_statement(
            StatementDescriptor::select(
                "getEmployeeSummaries",
                "SELECT EMPLOYEE_ID AS EMP_NO, FIRST_NAME AS GIVEN, LAST_NAME AS FAMILY, \
                 DEPARTMENT_ID AS DEPT FROM EMPLOYEES ORDER BY EMPLOYEE_ID",
            )
            .with_result_map("employeeSummary"),
        )
        .with_statement(
            StatementDescriptor::select("countEmployees", "SELECT COUNT(*) AS TOTAL FROM EMPLOYEES")
                .with_result_type("long"),
        )
        .with_statement(
            StatementDescriptor::insert(
                "insertEmployee",
                "INSERT INTO EMPLOYEES (FIRST_NAME, LAST_NAME, EMAIL, DEPARTMENT_ID) \
                 VALUES (#{firstName}, #{lastName}, #{email}, #{departmentId})",
            )
            .with_parameter_type("Employee")
            .generated_key("employeeId")
            .flush_cache(),
        )
        .with_statement(
            StatementDescriptor::update(
                "updateEmail",
                "UPDATE EMPLOYEES SET EMAIL = #{email} WHERE EMPLOYEE_ID = #{employeeId}",
            )
            .with_parameter_type("Employee"),
        )
        .with_statement(
            StatementDescriptor::update(
                "updateEmailKeyed",
                "UPDATE EMPLOYEES SET EMAIL = #{email} WHERE EMPLOYEE_ID = #{employeeId}",
            )
            .with_parameter_type("Employee")
            .generated_key("employeeId"),
        )
        .with_statement(
            StatementDescriptor::delete(
                "deleteEmployee",
                "DELETE FROM EMPLOYEES WHERE EMPLOYEE_ID = #{employeeId}",
            )
            .with_parameter_type("long")
            .flush_cache(),
        )
}

pub fn configuration(db: &TestDb, policy: EvictionPolicy) -> Configuration {
    Configuration::new(
        EnvironmentConfig::new("test", ConnectionParams::new(db.url.clone()))
            .with_pool(PoolConfig::default().with_pool_size(2)),
    )
    .with_environment(
        EnvironmentConfig::new("unpooled", ConnectionParams::new(db.url.clone())).unpooled(),
    )
    .with_mapper(employee_mapper(policy))
}
