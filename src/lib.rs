#[macro_use]
pub extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

pub extern crate chrono;

pub use diesel::prelude::*;
pub use diesel::pg::PgConnection;

macro_rules! try_or {
    ($t:expr , else $e:expr ) => {  match $t { Some(x) => x, None => { $e } }  }
}

pub mod schema;
pub mod models;
pub mod scheduler;
pub mod progress;
pub mod quiz;
pub mod event;
pub mod user;
pub mod manage;
pub use crate::models::*;

pub mod errors {

    error_chain! {
        foreign_links {
            ParseBool(::std::str::ParseBoolError);
            ParseInt(::std::num::ParseIntError);
            Var(::std::env::VarError);
            StdIo(::std::io::Error);
            Diesel(::diesel::result::Error);
            DieselConnection(::diesel::ConnectionError);
            DieselMigration(::diesel_migrations::RunMigrationsError);
            Json(::serde_json::Error);
        }
        errors {
            InvalidPool(tag: String) {
                description("Invalid pool tag")
                display("The pool tag {:?} is not one of P0-P6, R1-R5.", tag)
            }
            NoSuchUser(username: String) {
                description("No such user exists")
                display("No user with the name {:?} exists.", username)
            }
            UserExists(username: String) {
                description("User already exists")
                display("A user with the name {:?} already exists.", username)
            }
            UsernameNotValid {
                description("Username not valid")
                display("A valid username is 1-50 characters and contains no whitespace.")
            }
            NoSuchWord(word: String) {
                description("No such word exists")
                display("No word {:?} exists in the catalog.", word)
            }
            NoSuchProgress(word_id: i32) {
                description("No progress record for that word")
                display("The user has no progress record for word id {}.", word_id)
            }
            WordNotInPool(word_id: i32, expected: &'static str) {
                description("Word is in the wrong pool for this operation")
                display("Word id {} is not in {}.", word_id, expected)
            }
            EventBatchEmpty {
                description("Empty event batch")
                display("An event batch must contain at least one event.")
            }
            EventBatchTooLarge(size: usize) {
                description("Event batch too large")
                display("An event batch may contain at most 20 events; got {}.", size)
            }
            DatabaseOdd(reason: &'static str) {
                description("There's something wrong with the contents of the DB vs. how it should be!")
                display("There's something wrong with the contents of the DB vs. how it should be! {}", reason)
            }
        }
    }
}

pub use crate::errors::*;


pub mod db {
    use super::errors::*;
    use super::schema;
    use diesel::prelude::*;
    use diesel::pg::PgConnection;
    use diesel::r2d2;

    pub type ConnManager = r2d2::ConnectionManager<PgConnection>;
    pub type ConnPool = r2d2::Pool<ConnManager>;
    pub type PooledConn = r2d2::PooledConnection<ConnManager>;

    pub fn connect(database_url: &str) -> Result<PgConnection> {
        PgConnection::establish(database_url).chain_err(|| "Error connecting to database!")
    }

    pub fn pool(database_url: &str) -> Result<ConnPool> {
        r2d2::Pool::new(ConnManager::new(database_url))
            .chain_err(|| "Couldn't start a database connection pool!")
    }

    /// Runs the migrations and tells whether the database is populated at all.
    pub fn check(conn: &PgConnection) -> Result<bool> {
        run_db_migrations(conn).chain_err(|| "Couldn't run the migrations.")?;
        is_installed(conn)
    }

    pub fn is_installed(conn: &PgConnection) -> Result<bool> {
        let count: i64 = schema::users::table
            .count()
            .get_result(conn)?;

        Ok(count > 0)
    }

    #[cfg(not(debug_assertions))]
    embed_migrations!();

    #[cfg(not(debug_assertions))]
    fn run_db_migrations(conn: &PgConnection) -> Result<()> {
        embedded_migrations::run(conn)?;
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn run_db_migrations(conn: &PgConnection) -> Result<()> {
        diesel_migrations::run_pending_migrations(conn)?;
        info!("Migrations checked.");
        Ok(())
    }
}
