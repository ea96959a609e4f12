#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use crate::http::views;
use crate::utils::errors::Errors;

/// A zero-argument view producing a response body.
pub type View = Box<dyn Fn() -> Result<String, Errors> + Send + Sync>;

// Paths that always redirect to the site root.
pub const REDIRECTS: [&str; 2] = ["/home", "/index"];

// ***************************************************************************
//                                RouteTable
// ***************************************************************************
/** The static url table.  It is built once at startup and never modified. */
pub struct RouteTable {
    routes: HashMap<String, View>,
    redirects: HashSet<String>,
}

impl RouteTable {
    /// An empty table, used to assemble custom route sets.
    pub fn new() -> Self {
        RouteTable { routes: HashMap::new(), redirects: HashSet::new() }
    }

    /// The site's routes with views reading templates from templates_dir.
    pub fn with_views(templates_dir: &str) -> Self {
        let index_dir = templates_dir.to_string();
        let about_dir = templates_dir.to_string();

        let mut table = RouteTable::new()
            .route("/", move || views::index(&index_dir))
            .route("/about", move || views::about(&about_dir));
        for path in REDIRECTS {
            table = table.redirect(path);
        }
        table
    }

    pub fn route<F>(mut self, path: &str, view: F) -> Self
    where
        F: Fn() -> Result<String, Errors> + Send + Sync + 'static,
    {
        self.routes.insert(path.to_string(), Box::new(view));
        self
    }

    pub fn redirect(mut self, path: &str) -> Self {
        self.redirects.insert(path.to_string());
        self
    }

    pub fn view(&self, path: &str) -> Option<&View> {
        self.routes.get(path)
    }

    pub fn is_redirect(&self, path: &str) -> bool {
        self.redirects.contains(path)
    }

    /// Registered paths, sorted, for logging.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::new()
    }
}
