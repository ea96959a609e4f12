#![forbid(unsafe_code)]

use anyhow::Result;
use lazy_static::lazy_static;
use log::{error, info};

// MiniWeb Utilities
use mini_web::http::server;
use mini_web::orm::database::Database;
use mini_web::utils::config::{init_log, init_runtime_context, seed_templates, RuntimeCtx,
                              MINIWEB_ARGS, MINIWEB_DIRS};
use mini_web::utils::errors::Errors;

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Lazily initialize the parameters variable so that is has a 'static lifetime.
// We exit if we can't read our parameters.
lazy_static! {
    static ref RUNTIME_CTX: RuntimeCtx = init_runtime_context();
}

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<()> {
    // --------------- Initialize MiniWeb -----------------
    // Announce ourselves.
    println!("Starting mini_web!");

    // Just create the data directories when requested.
    if MINIWEB_ARGS.create_dirs_only {
        println!("MiniWeb data directories created under {}", MINIWEB_DIRS.root_dir);
        return Ok(());
    }

    // Initialize the server.
    miniweb_init()?;

    // Report on the database.
    let tables = list_tables().await?;
    if MINIWEB_ARGS.list_tables {
        for t in &tables {
            println!("{}", t);
        }
        return Ok(());
    }

    // ------------------ Main Loop -------------------
    // The accept loop blocks, so it runs on its own thread.
    match tokio::task::spawn_blocking(|| server::run(&RUNTIME_CTX)).await? {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Server terminated: {}", e);
            Err(e)
        }
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// miniweb_init:
// ---------------------------------------------------------------------------
/** Initialing all subsystems and data structures other than those needed
 * to configure the main loop processor.
 */
fn miniweb_init() -> Result<()> {
    // Configure out log.
    init_log();

    // Force the reading of input parameters and initialization of runtime context.
    info!("{}", Errors::InputParms(format!("{:#?}", *RUNTIME_CTX)));

    // Log build info.
    print_version_info();

    // Make sure the views have something to render.
    seed_templates(&RUNTIME_CTX.miniweb_dirs.templates_dir)
}

// ---------------------------------------------------------------------------
// list_tables:
// ---------------------------------------------------------------------------
/** Open the configured database, log its tables and close it again.  The
 * web pipeline doesn't use the database.
 */
async fn list_tables() -> Result<Vec<String>> {
    let mut db = Database::open(&RUNTIME_CTX.db_path).await?;
    let tables = db.tables().await?;
    info!("Database {} contains tables: {:?}", db.name(), tables);
    db.close().await?;
    Ok(tables)
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    // Log build info.
    info!("{}.", format!("\n*** Running MiniWeb={}, BRANCH={}, COMMIT={}, DIRTY={}, SRC_TS={}, RUSTC={}",
                        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
                        option_env!("GIT_BRANCH").unwrap_or("unknown"),
                        option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
                        option_env!("GIT_DIRTY").unwrap_or("unknown"),
                        option_env!("SOURCE_TIMESTAMP").unwrap_or("unknown"),
                        option_env!("RUSTC_VERSION").unwrap_or("unknown")),
    );
}
