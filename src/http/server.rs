#![forbid(unsafe_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use anyhow::Result;
use log::{error, info, warn};

use crate::http::pipeline::{Pipeline, Status};
use crate::http::routes::RouteTable;
use crate::utils::config::RuntimeCtx;
use crate::utils::web_utils::debug_request;

// ---------------------------------------------------------------------------
// run:
// ---------------------------------------------------------------------------
/** Bind the configured address and serve connections forever.  Only a bind
 * failure returns.
 */
pub fn run(ctx: &RuntimeCtx) -> Result<()> {
    let routes = RouteTable::with_views(&ctx.miniweb_dirs.templates_dir);
    info!("Serving paths {:?}, redirecting to {}", routes.paths(), ctx.redirect_location());
    let pipeline = Pipeline::new(routes, &ctx.redirect_location());

    let config = &ctx.parms.config;
    let addr = format!("{}:{}", config.http_addr, config.http_port);
    let listener = TcpListener::bind(&addr)?;
    info!("{} listening on {}", config.title, addr);

    serve(listener, &pipeline, config.read_buffer_size)
}

// ---------------------------------------------------------------------------
// serve:
// ---------------------------------------------------------------------------
/** Accept and handle one connection at a time.  Errors on a single
 * connection are logged and never stop the loop.
 */
pub fn serve(listener: TcpListener, pipeline: &Pipeline, buffer_size: usize) -> Result<()> {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = handle_connection(stream, peer, pipeline, buffer_size) {
                    warn!("Connection from {} failed: {}", peer, e);
                }
            }
            Err(e) => error!("Unable to accept connection: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// handle_connection:
// ---------------------------------------------------------------------------
/** Read the request with a single bounded read, write the complete response
 * and close the connection when the stream is dropped.  Returns the status
 * sent, or None if the peer closed before sending anything.
 */
pub fn handle_connection(mut stream: TcpStream, peer: SocketAddr, pipeline: &Pipeline,
                         buffer_size: usize)
    -> io::Result<Option<Status>>
{
    let mut buf = vec![0u8; buffer_size];
    let n = stream.read(&mut buf)?;
    if n == 0 {
        info!("{} disconnected without sending a request", peer);
        return Ok(None);
    }

    let raw = String::from_utf8_lossy(&buf[..n]);
    debug_request(&peer, &raw);
    let first_line = raw.lines().next().unwrap_or_default();

    let response = match pipeline.respond(&raw) {
        Ok(r) => {
            info!("{} \"{}\" {}", peer, first_line, r.status);
            r
        }
        Err(e) => {
            warn!("{} {}", peer, e);
            pipeline.error_response(Status::BadRequest)
        }
    };

    stream.write_all(&response.bytes)?;
    stream.flush()?;
    Ok(Some(response.status))
}
