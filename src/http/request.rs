#![forbid(unsafe_code)]

use crate::utils::errors::Errors;

// ***************************************************************************
//                               RequestLine
// ***************************************************************************
/// The two request line tokens the pipeline acts on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
}

// ---------------------------------------------------------------------------
// parse:
// ---------------------------------------------------------------------------
/** Split the raw request on whitespace and take the first two tokens as the
 * method and path.  The protocol version, headers and body are ignored.
 */
pub fn parse(request: &str) -> Result<RequestLine, Errors> {
    let mut tokens = request.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(method), Some(path)) => Ok(RequestLine {
            method: method.to_string(),
            path: path.to_string(),
        }),
        _ => {
            // Keep only the first line for the error message.
            let first = request.lines().next().unwrap_or_default();
            Err(Errors::MalformedRequest(first.to_string()))
        }
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_and_path() {
        let req = "GET /about HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\n";
        let line = parse(req).unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/about");
    }

    #[test]
    fn version_is_not_required() {
        let line = parse("DELETE /x").unwrap();
        assert_eq!(line, RequestLine { method: "DELETE".to_string(), path: "/x".to_string() });
    }

    #[test]
    fn missing_tokens_are_malformed() {
        assert!(matches!(parse(""), Err(Errors::MalformedRequest(_))));
        assert!(matches!(parse("   \r\n"), Err(Errors::MalformedRequest(_))));
        assert!(matches!(parse("GET"), Err(Errors::MalformedRequest(_))));
    }
}
