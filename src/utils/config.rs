#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error};
use serde::Deserialize;
use std::{env, fs, path::Path};
use fs_mistrust::Mistrust;
use std::os::unix::fs::PermissionsExt;
use lazy_static::lazy_static;
use structopt::StructOpt;

// MiniWeb Utilities
use crate::utils::{web_utils, errors::Errors};

use super::web_utils::get_absolute_path;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_MINIWEB_ROOT_DIR : &str = "MINIWEB_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.miniweb";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const DATABASE_DIR         : &str = "/database";
const TEMPLATES_DIR        : &str = "/templates";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";  // relative to config dir
const MINIWEB_CONFIG_FILE  : &str = "/mini_web.toml"; // relative to config dir

// Networking.
const ENV_MINIWEB_HOST     : &str = "MINIWEB_HOST";
const DEFAULT_HOST         : &str = "localhost";
const DEFAULT_HTTP_ADDR    : &str = "0.0.0.0";
const DEFAULT_HTTP_PORT    : u16  = 8080;
const DEFAULT_READ_BUFFER  : usize = 4096;

// Database.
const DEFAULT_DB_FILE      : &str = "mini_web.db";

// Files seeded into the data directories on first use.
const DEFAULT_LOG4RS_YML   : &str = include_str!("../../resources/log4rs.yml");
const LOGS_DIR_PLACEHOLDER : &str = "${LOGS_DIR}";
pub const INDEX_TEMPLATE   : &str = "index.html";
pub const ABOUT_TEMPLATE   : &str = "about.html";
const DEFAULT_INDEX_HTML   : &str = include_str!("../../resources/templates/index.html");
const DEFAULT_ABOUT_HTML   : &str = include_str!("../../resources/templates/about.html");

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Assign the command line arguments BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref MINIWEB_ARGS: MiniWebArgs = init_miniweb_args();
}

// Calculate the data directories BEFORE RUNTIME_CTX is initialized in main.
lazy_static! {
    pub static ref MINIWEB_DIRS: MiniWebDirs = init_miniweb_dirs();
}

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// MiniWebDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
pub struct MiniWebDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
    pub database_dir: String,
    pub templates_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// CommandLineArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, StructOpt)]
#[structopt(name = "mini_web_args", about = "Command line arguments for the MiniWeb server.")]
pub struct MiniWebArgs {
    /// Specify MiniWeb's root data directory.
    ///
    /// This directory contains all the files MiniWeb uses during execution.
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Create the data directories and then exit.
    ///
    /// The data directories will be rooted at a root directory calculated
    /// using the following priority order:
    ///
    ///   1. If set, the value of the MINIWEB_ROOT_DIR environment,
    ///
    ///   2. Otherwise, if set, the value of the --root_dir command line argument,
    ///
    ///   3. Otherwise, ~/.miniweb
    ///
    #[structopt(short, long)]
    pub create_dirs_only: bool,

    /// Print the tables defined in the database and then exit.
    #[structopt(short, long)]
    pub list_tables: bool,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct RuntimeCtx {
    pub parms: Parms,
    /// Host name advertised in redirect locations.
    pub host: String,
    pub db_path: String,
    pub miniweb_args: &'static MiniWebArgs,
    pub miniweb_dirs: &'static MiniWebDirs,
}

impl RuntimeCtx {
    /// The host:port pair that redirects point to.
    pub fn redirect_location(&self) -> String {
        format!("{}:{}", self.host, self.parms.config.http_port)
    }
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub read_buffer_size: usize,
    pub db_file: String,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "MiniWeb Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            read_buffer_size: DEFAULT_READ_BUFFER,
            db_file: DEFAULT_DB_FILE.to_string(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_miniweb_args:
// ---------------------------------------------------------------------------
/** Get the command line arguments. */
fn init_miniweb_args() -> MiniWebArgs {
    let args = MiniWebArgs::from_args();
    println!("{:?}", args);
    args
}

// ---------------------------------------------------------------------------
// init_miniweb_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories. */
fn init_miniweb_dirs() -> MiniWebDirs {
    // Initialize the mistrust object.
    let mistrust = get_mistrust();

    // Check that each path is absolute and is a directory with the
    // proper permission assign if it exists.  If it doesn't exist,
    // create it.
    let root_dir = get_root_dir();
    check_miniweb_dir(&root_dir, "root directory", &mistrust);

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_miniweb_dir(&config_dir, "config directory", &mistrust);

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_miniweb_dir(&logs_dir, "logs directory", &mistrust);

    let database_dir = root_dir.clone() + DATABASE_DIR;
    check_miniweb_dir(&database_dir, "database directory", &mistrust);

    let templates_dir = root_dir.clone() + TEMPLATES_DIR;
    check_miniweb_dir(&templates_dir, "templates directory", &mistrust);

    // Package up and return the directories.
    MiniWebDirs {
        root_dir, config_dir, logs_dir, database_dir, templates_dir,
    }
}

// ---------------------------------------------------------------------------
// check_miniweb_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 *
 * Any failure results in a panic.
 */
fn check_miniweb_dir(dir: &String, msgname: &str, mistrust: &Mistrust) {
    // Get the path object.
    let path = Path::new(dir);
    if !path.is_absolute() {
        panic!("The MiniWeb {} path must be absolute: {}", msgname, dir);
    }
    if path.exists() {
        // Make sure the path represents a directory.
        if !path.is_dir() {
            panic!("The MiniWeb {} path must be a directory: {}", msgname, dir);
        }

        // Make sure the directory had rwx for owner only.
        let meta = path.metadata().unwrap_or_else(|_| panic!("Unable to read metadata for {}: {}", msgname, dir));
        let perm = meta.permissions().mode();
        if perm & 0o777 != 0o700 {
            panic!("The MiniWeb {} path must be have 0o700 permissions: {}", msgname, dir);
        }
    } else {
        // Create the directory with the correct permissions.
        if let Err(e) = mistrust.make_directory(path) {
            panic!("Make directory error for {:?}: {}", path, &e.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
/** Configure a new mistrust object for initial directory processing. */
fn get_mistrust() -> Mistrust {
    match Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build() {
            Ok(m) => m,
            Err(e) => {
                panic!("Mistrust configuration error: {}", &e.to_string());
            }
        }
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir() -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    //
    let root_dir = env::var(ENV_MINIWEB_ROOT_DIR).unwrap_or_else(
        |_| {
            match MINIWEB_ARGS.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    // Canonicalize the path.
    get_absolute_path(&root_dir)
}

// ---------------------------------------------------------------------------
// seed_file:
// ---------------------------------------------------------------------------
/** Write the default contents to the file if the file doesn't exist yet.
 * Existing files are never overwritten.  Returns true if the file was written.
 */
pub fn seed_file(path: &str, contents: &str) -> Result<bool> {
    if Path::new(path).exists() {
        return Ok(false);
    }
    fs::write(path, contents)?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// seed_templates:
// ---------------------------------------------------------------------------
/** Install the default index and about templates when they are absent. */
pub fn seed_templates(templates_dir: &str) -> Result<()> {
    for (name, html) in [(INDEX_TEMPLATE, DEFAULT_INDEX_HTML), (ABOUT_TEMPLATE, DEFAULT_ABOUT_HTML)] {
        let path = format!("{}/{}", templates_dir, name);
        if seed_file(&path, html)? {
            info!("Installed default template {}", path);
        }
    }
    Ok(())
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
pub fn init_log() {
    // Install the default log configuration on first use.
    let logconfig = init_log_config();
    let contents = DEFAULT_LOG4RS_YML.replace(LOGS_DIR_PLACEHOLDER, &MINIWEB_DIRS.logs_dir);
    if let Err(e) = seed_file(&logconfig, &contents) {
        println!("Unable to install default log configuration {}: {}", logconfig, e);
    }

    // Initialize log4rs logging.
    match log4rs::init_file(logconfig.clone(), Default::default()) {
        Ok(_) => (),
        Err(e) => {
            println!("{}", e);
            let s = format!("{}", Errors::Log4rsInitialization(logconfig));
            panic!("{}", s);
        },
    }
    info!("Log4rs initialized using: {}", logconfig);
}

// ---------------------------------------------------------------------------
// init_log_config:
// ---------------------------------------------------------------------------
fn init_log_config() -> String {
    MINIWEB_DIRS.config_dir.clone() + LOG4RS_CONFIG_FILE
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Retrieve the application parameters from the configuration file in the
 * config data directory.  If the file cannot be read, default values are used.
 */
fn get_parms() -> Result<Parms> {
    // Get the config file path from its data directory.
    let config_file = MINIWEB_DIRS.config_dir.clone() + MINIWEB_CONFIG_FILE;

    // Read the cofiguration file.
    let config_file_abs = web_utils::get_absolute_path(&config_file);
    info!("{}", Errors::ReadingConfigFile(config_file_abs.clone()));
    let contents = match fs::read_to_string(&config_file_abs) {
        Ok(c) => c,
        Err(_) => {
            println!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    let config = parse_config(&contents, &config_file_abs)?;
    Ok(Parms { config_file: config_file_abs, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
/** Parse the toml configuration text.  Fields that are not specified take
 * their default values.
 */
pub fn parse_config(contents: &str, config_file: &str) -> Result<Config> {
    let config: Config = match toml::from_str(contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()), e);
            error!("{}", msg);
            return Result::Err(anyhow!(msg));
        }
    };

    // An empty read buffer would turn every request into an empty read.
    if config.read_buffer_size == 0 {
        let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()),
                          Errors::MiniWebError("read_buffer_size must be greater than zero".to_string()));
        error!("{}", msg);
        return Result::Err(anyhow!(msg));
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// get_host:
// ---------------------------------------------------------------------------
/** The redirect host comes from the environment, falling back to a literal. */
pub fn get_host() -> String {
    env::var(ENV_MINIWEB_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context() -> RuntimeCtx {
    // If this fails the application aborts.
    let parms = get_parms().expect("FAILED to read configuration file.");
    let db_path = MINIWEB_DIRS.database_dir.clone() + "/" + parms.config.db_file.as_str();
    RuntimeCtx {parms, host: get_host(), db_path,
                miniweb_args: &MINIWEB_ARGS, miniweb_dirs: &MINIWEB_DIRS}
}
