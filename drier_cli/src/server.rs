//! HTTP/1 shell around `drier_core::api`.
//!
//! One task per connection; each request body is collected up to
//! `server.max_body_bytes` and handed to the API on the blocking pool,
//! since the controller does synchronous file IO.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use drier_core::Controller;
use drier_core::api::{self, ApiResponse};
use eyre::WrapErr;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;

type HttpBody = Full<Bytes>;

pub async fn bind(addr: SocketAddr) -> eyre::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("bind {addr}"))
}

/// Serve until `shutdown` resolves, then write the restart snapshot.
pub async fn run(
    listener: TcpListener,
    ctrl: Arc<Controller>,
    max_body_bytes: usize,
    shutdown: impl Future<Output = ()>,
) -> eyre::Result<()> {
    let local = listener.local_addr().wrap_err("listener address")?;
    tracing::info!(addr = %local, "listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let ctrl = Arc::clone(&ctrl);
                tokio::spawn(async move {
                    let svc = service_fn(move |req| handle(Arc::clone(&ctrl), max_body_bytes, req));
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        tracing::debug!(%peer, error = %e, "connection error");
                    }
                });
            }
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    let ctrl = Arc::clone(&ctrl);
    let persisted = tokio::task::spawn_blocking(move || ctrl.persist_on_shutdown())
        .await
        .unwrap_or(false);
    if !persisted {
        tracing::warn!("exiting without a fresh restart snapshot");
    }
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
}

async fn handle(
    ctrl: Arc<Controller>,
    max_body_bytes: usize,
    req: Request<Incoming>,
) -> Result<Response<HttpBody>, Infallible> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();

    let body = match Limited::new(req.into_body(), max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let resp = if e.is::<http_body_util::LengthLimitError>() {
                ApiResponse::new(
                    413,
                    json!({"status": "error", "message": format!("request body exceeds {max_body_bytes} bytes")}),
                )
            } else {
                ApiResponse::new(
                    400,
                    json!({"status": "error", "message": format!("cannot read request body: {e}")}),
                )
            };
            return Ok(to_response(&resp, &path));
        }
    };

    let route = path.clone();
    let resp = tokio::task::spawn_blocking(move || api::handle(&ctrl, &method, &route, &body))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "request handler panicked");
            ApiResponse::new(500, json!({"status": "error", "message": "internal error"}))
        });
    tracing::debug!(path = %path, status = resp.status, "request handled");
    Ok(to_response(&resp, &path))
}

fn to_response(resp: &ApiResponse, path: &str) -> Response<HttpBody> {
    let mut out = Response::new(Full::new(Bytes::from(resp.to_bytes())));
    *out.status_mut() =
        StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    out.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if resp.status == 405 {
        if let Some(allowed) = api::allowed_method(path) {
            out.headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allowed));
        }
    }
    out
}
