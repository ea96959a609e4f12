#![forbid(unsafe_code)]

use std::fs;

use crate::utils::config::{ABOUT_TEMPLATE, INDEX_TEMPLATE};
use crate::utils::errors::Errors;
use crate::utils::web_utils::render;

// Templates are read from disk on every request, so edits show up without
// a restart.
fn read_template(templates_dir: &str, name: &str) -> Result<String, Errors> {
    Ok(fs::read_to_string(format!("{}/{}", templates_dir, name))?)
}

// ---------------------------------------------------------------------------
// index:
// ---------------------------------------------------------------------------
pub fn index(templates_dir: &str) -> Result<String, Errors> {
    let name = "World";
    let html = read_template(templates_dir, INDEX_TEMPLATE)?;
    render(&html, &[("name", name)])
}

// ---------------------------------------------------------------------------
// about:
// ---------------------------------------------------------------------------
pub fn about(templates_dir: &str) -> Result<String, Errors> {
    let html = read_template(templates_dir, ABOUT_TEMPLATE)?;
    render(&html, &[])
}
