use crate::prelude::DB;

/// Keeps a temporary DB alive. Dropping it closes the DB and then deletes its directory, so it
/// must outlive every handle used by the test.
#[derive(Default)]
pub struct DbLifetime {
    weak_db_ref: std::sync::Weak<DB>,
    tempdir: Option<tempfile::TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: tempfile::TempDir, weak_db_ref: std::sync::Weak<DB>) -> Self {
        Self { tempdir: Some(tempdir), weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        for _ in 0..16 {
            if self.weak_db_ref.strong_count() > 0 {
                // Background threads may still be releasing their handles
                std::thread::sleep(std::time::Duration::from_millis(50));
            } else {
                break;
            }
        }
        if self.weak_db_ref.strong_count() > 0 {
            eprintln!("temp DB is still referenced while its lifetime ends");
        }
        drop(self.tempdir.take());
    }
}

pub fn get_granary_tempdir() -> tempfile::TempDir {
    let global_tempdir = std::env::temp_dir();
    let granary_tempdir = global_tempdir.join("granary-rust");
    let _ = std::fs::create_dir_all(granary_tempdir.as_path());
    tempfile::tempdir_in(granary_tempdir.as_path()).unwrap_or_else(|_| tempfile::tempdir().expect("a temp dir can be created"))
}

/// Creates a DB within a temp directory under `<OS SPECIFIC TEMP DIR>/granary-rust`
/// Callers must keep the `DbLifetime` guard for as long as they wish the DB to exist.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{
        let db_tempdir = $crate::utils::get_granary_tempdir();
        let db_path = db_tempdir.path().to_owned();
        let db = $conn_builder.with_db_path(db_path).build().unwrap();
        ($crate::utils::DbLifetime::new(db_tempdir, std::sync::Arc::downgrade(&db)), db)
    }};
}

