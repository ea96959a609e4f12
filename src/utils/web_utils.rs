#![forbid(unsafe_code)]

use path_absolutize::Absolutize;
use std::net::SocketAddr;
use std::ops::Deref;
use std::path::Path;

use log::{debug, LevelFilter};

use crate::utils::errors::Errors;

// ***************************************************************************
// GENERAL PUBLIC FUNCTIONS
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_absolute_path:
// ---------------------------------------------------------------------------
/** Replace tilde (~) and environment variable values in a path name and
 * then construct the absolute path name.  The difference between
 * absolutize and standard canonicalize methods is that absolutize does not
 * care about whether the file exists and what the file really is.
 */
pub fn get_absolute_path(path: &str) -> String {
    // Replace ~ and environment variable values if possible.
    // On error, return the string version of the original path.
    let s = match shellexpand::full(path) {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };

    // Convert to absolute path if necessary.
    // Return original input on error.
    let p = Path::new(s.deref());
    let p1 = match p.absolutize() {
        Ok(x) => x,
        Err(_) => return path.to_owned(),
    };
    let p2 = match p1.to_str() {
        Some(x) => x,
        None => return path.to_owned(),
    };

    p2.to_owned()
}

// ---------------------------------------------------------------------------
// render:
// ---------------------------------------------------------------------------
/** Substitute `{name}` placeholders in an html template with the values
 * assigned to those names in args.  Doubled braces (`{{` and `}}`) produce
 * a single literal brace.
 *
 * A placeholder with no assigned value, an unterminated placeholder or a
 * lone closing brace is a template error.
 */
pub fn render(html: &str, args: &[(&str, &str)]) -> Result<String, Errors> {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                // Escaped opening brace.
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }

                // Collect the placeholder name up to the closing brace.
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(Errors::TemplateError(
                                format!("nested '{{' in placeholder '{}'", key)));
                        }
                        Some(ch) => key.push(ch),
                        None => {
                            return Err(Errors::TemplateError(
                                format!("unterminated placeholder '{{{}'", key)));
                        }
                    }
                }

                // Substitute the value.
                match args.iter().find(|(k, _)| *k == key) {
                    Some((_, v)) => out.push_str(v),
                    None => {
                        return Err(Errors::TemplateError(
                            format!("no value supplied for placeholder '{}'", key)));
                    }
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(Errors::TemplateError("single '}' encountered in template".to_string()));
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// redirect:
// ---------------------------------------------------------------------------
/** Return the complete header block of a permanent redirect to the given
 * host:port location.  The body of a redirect is always empty.
 */
pub fn redirect(location: &str) -> String {
    format!("HTTP/1.1 301 Moved permanently\nLocation: http://{}\n\n", location)
}

// ---------------------------------------------------------------------------
// debug_request:
// ---------------------------------------------------------------------------
// Dump the raw request text to the log.
pub fn debug_request(peer: &SocketAddr, raw: &str) {
    // Check that debug or higher logging is in effect.
    let level = log::max_level();
    if level < LevelFilter::Debug {
        return;
    }

    // Accumulate the output.
    let mut s = "\n".to_string();
    s += format!("  Peer: {}\n", peer).as_str();
    for line in raw.lines() {
        s += format!("  > {}\n", line).as_str();
    }

    // Write the single log record.
    debug!("{}", s);
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_named_values() {
        let html = "<h1>Hello, {name}!</h1><p>{name} again</p>";
        let out = render(html, &[("name", "World")]).unwrap();
        assert_eq!(out, "<h1>Hello, World!</h1><p>World again</p>");
    }

    #[test]
    fn render_without_placeholders_is_identity() {
        let html = "<h1>About</h1>\n<p>Nothing to see.</p>\n";
        assert_eq!(render(html, &[]).unwrap(), html);
    }

    #[test]
    fn render_unescapes_doubled_braces() {
        let html = "<style>body {{ margin: 0; }}</style>{greeting}";
        let out = render(html, &[("greeting", "hi")]).unwrap();
        assert_eq!(out, "<style>body { margin: 0; }</style>hi");
    }

    #[test]
    fn render_rejects_unknown_placeholder() {
        let err = render("<p>{missing}</p>", &[("name", "World")]).unwrap_err();
        assert!(matches!(err, Errors::TemplateError(_)));
    }

    #[test]
    fn render_rejects_unbalanced_braces() {
        assert!(render("<p>{name</p>", &[("name", "x")]).is_err());
        assert!(render("<p>name}</p>", &[("name", "x")]).is_err());
    }

    #[test]
    fn redirect_header_block() {
        assert_eq!(redirect("localhost:8080"),
                   "HTTP/1.1 301 Moved permanently\nLocation: http://localhost:8080\n\n");
    }

    #[test]
    fn absolute_path_is_absolute() {
        let p = get_absolute_path("some/relative/dir");
        assert!(Path::new(&p).is_absolute());
        assert!(p.ends_with("some/relative/dir"));
    }
}
