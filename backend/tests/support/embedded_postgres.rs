//! Embedded PostgreSQL provisioning for the Diesel adapter suites.
//!
//! One cluster is shared by every test in a binary. Each test gets its own
//! database cloned from a template that already carries the migrations; the
//! template name includes a hash of `migrations/` so schema edits produce a
//! fresh template instead of reusing a stale one.
//!
//! Setting `SKIP_TEST_CLUSTER` to a truthy value turns setup failures into
//! skips for environments that cannot start PostgreSQL.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use commerce::outbound::persistence::run_migrations;
use pg_embedded_setup_unpriv::test_support::{hash_directory, shared_cluster_handle};
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use uuid::Uuid;

static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const TEMPLATE_NAME_PREFIX: &str = "commerce_template";
const SETUP_RETRIES: usize = 5;
const SETUP_RETRY_DELAY: Duration = Duration::from_millis(500);

fn template_name() -> Result<String, String> {
    let migrations = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let hash = hash_directory(migrations).map_err(|err| format!("hash migrations: {err}"))?;
    let short_hash = hash.get(..8).unwrap_or(&hash);
    Ok(format!("{TEMPLATE_NAME_PREFIX}_{short_hash}"))
}

/// Create the migrated template once per cluster and return its name.
fn ensure_template(cluster: &ClusterHandle) -> Result<String, String> {
    let name = template_name()?;
    let _lock = TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let exists = cluster
        .database_exists(name.as_str())
        .map_err(|err| format!("template check: {err:?}"))?;
    if !exists {
        cluster
            .create_database(name.as_str())
            .map_err(|err| format!("create template: {err:?}"))?;
        let url = cluster.connection().database_url(&name);
        run_migrations(&url).map_err(|err| err.to_string())?;
    }
    Ok(name)
}

/// Shared cluster for this test binary, started on first use.
pub fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut attempt = 1;
    loop {
        match shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) if attempt >= SETUP_RETRIES => return Err(err.to_string()),
            Err(_) => {
                std::thread::sleep(SETUP_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Clone a fresh database from the migrated template.
///
/// The database is dropped when the returned guard goes out of scope.
pub fn provision_database(cluster: &ClusterHandle) -> Result<TemporaryDatabase, String> {
    let mut last_error = String::from("create database from template: exhausted retries");
    for attempt in 1..=SETUP_RETRIES {
        let cloned = ensure_template(cluster).and_then(|template| {
            let name = format!("test_{}", Uuid::new_v4());
            cluster
                .temporary_database_from_template(name.as_str(), template.as_str())
                .map_err(|err| format!("create database from template: {err:?}"))
        });
        match cloned {
            Ok(database) => return Ok(database),
            Err(err) => last_error = format!("attempt {attempt}/{SETUP_RETRIES}: {err}"),
        }
        if attempt < SETUP_RETRIES {
            std::thread::sleep(SETUP_RETRY_DELAY);
        }
    }
    Err(last_error)
}

/// True when `SKIP_TEST_CLUSTER` is "1", "true" or "yes" in any case.
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when the environment opts out of the cluster, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
