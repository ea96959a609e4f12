#![forbid(unsafe_code)]

use std::fmt;

use log::error;

use crate::http::request::parse;
use crate::http::routes::RouteTable;
use crate::utils::errors::Errors;
use crate::utils::web_utils::redirect;

// Only GET is served.
const METHOD_GET: &str = "GET";

// Fixed bodies.
pub const BODY_BAD_REQUEST: &str = "<h1>400 Bad request</h1>";
pub const BODY_NOT_FOUND: &str = "<h1>404 Page not found</h1>";
pub const BODY_METHOD_NOT_ALLOWED: &str = "<h1>405 Method not allowed</h1>";
pub const BODY_INTERNAL_ERROR: &str = "<h1>500 Internal server error</h1>";

// ***************************************************************************
//                                 Status
// ***************************************************************************
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    Ok,
    MovedPermanently,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok                  => 200,
            Status::MovedPermanently    => 301,
            Status::BadRequest          => 400,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok                  => "OK",
            Status::MovedPermanently    => "Moved permanently",
            Status::BadRequest          => "Bad request",
            Status::NotFound            => "Not found",
            Status::MethodNotAllowed    => "Method not allowed",
            Status::InternalServerError => "Internal server error",
        }
    }

    /// Lines end with a bare newline rather than CRLF.
    pub fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}\n", self.code(), self.reason())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

// ***************************************************************************
//                                Response
// ***************************************************************************
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    pub status: Status,
    pub bytes: Vec<u8>,
}

// ***************************************************************************
//                                Pipeline
// ***************************************************************************
/** Turns one raw request into the bytes written back to the client. */
pub struct Pipeline {
    routes: RouteTable,
    // host:port that redirects point at.
    location: String,
}

impl Pipeline {
    pub fn new(routes: RouteTable, location: &str) -> Self {
        Pipeline { routes, location: location.to_string() }
    }

    // ---------------------------------------------------------------------------
    // classify:
    // ---------------------------------------------------------------------------
    /** The method check comes first, so a non-GET request is refused even on
     * a path that doesn't exist.  Redirects take precedence over routes.
     */
    pub fn classify(&self, method: &str, path: &str) -> Status {
        if method != METHOD_GET {
            Status::MethodNotAllowed
        } else if self.routes.is_redirect(path) {
            Status::MovedPermanently
        } else if self.routes.view(path).is_none() {
            Status::NotFound
        } else {
            Status::Ok
        }
    }

    // ---------------------------------------------------------------------------
    // headers:
    // ---------------------------------------------------------------------------
    /** The status line and header lines, including the blank line that ends
     * the header block.
     */
    pub fn headers(&self, status: Status) -> String {
        match status {
            Status::MovedPermanently => redirect(&self.location),
            _ => status.status_line() + "\n",
        }
    }

    // ---------------------------------------------------------------------------
    // body:
    // ---------------------------------------------------------------------------
    pub fn body(&self, status: Status, path: &str) -> Result<String, Errors> {
        match status {
            Status::Ok => match self.routes.view(path) {
                Some(view) => view(),
                None => Ok(BODY_NOT_FOUND.to_string()),
            },
            Status::MovedPermanently    => Ok(String::new()),
            Status::BadRequest          => Ok(BODY_BAD_REQUEST.to_string()),
            Status::NotFound            => Ok(BODY_NOT_FOUND.to_string()),
            Status::MethodNotAllowed    => Ok(BODY_METHOD_NOT_ALLOWED.to_string()),
            Status::InternalServerError => Ok(BODY_INTERNAL_ERROR.to_string()),
        }
    }

    // ---------------------------------------------------------------------------
    // respond:
    // ---------------------------------------------------------------------------
    /** Parse, classify and render one request.  A request without a method
     * and path is returned as a MalformedRequest error.  A view that fails
     * produces a 500 response.
     */
    pub fn respond(&self, raw: &str) -> Result<Response, Errors> {
        let line = parse(raw)?;
        let status = self.classify(&line.method, &line.path);

        let response = match self.body(status, &line.path) {
            Ok(body) => Self::compose(self.headers(status), body, status),
            Err(e) => {
                error!("View for {} failed: {}", line.path, e);
                self.error_response(Status::InternalServerError)
            }
        };
        Ok(response)
    }

    // ---------------------------------------------------------------------------
    // error_response:
    // ---------------------------------------------------------------------------
    /** A complete response for any status with a fixed body. */
    pub fn error_response(&self, status: Status) -> Response {
        let body = match status {
            Status::Ok => String::new(),
            _ => self.body(status, "").unwrap_or_default(),
        };
        Self::compose(self.headers(status), body, status)
    }

    fn compose(headers: String, body: String, status: Status) -> Response {
        Response { status, bytes: (headers + &body).into_bytes() }
    }
}
