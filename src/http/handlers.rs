use http_body_util::BodyExt;
use hyper::{Method, StatusCode};
use juniper::http::{graphiql::graphiql_source, GraphQLBatchRequest};
use std::{sync::Arc, time::Instant};

use crate::{api, db::Session, prelude::*};
use super::{Context, Request, Response, log, response};


/// This is the main HTTP entry point, called for each incoming request.
pub(super) async fn handle(req: Request, ctx: Arc<Context>) -> Response {
    log::req::log(&req);
    if ctx.log_http_headers {
        log::headers::log(&req);
    }

    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/');

    match path {
        // The GraphQL endpoint. This is the only path for which POST is
        // allowed.
        "/graphql" if method == Method::POST => handle_api(req, &ctx).await,

        // The interactive GraphQL API explorer/IDE.
        "/graphql" if method == Method::GET || method == Method::HEAD => {
            response::html(graphiql_source("/graphql", None))
        }

        "/graphql" => response::method_not_allowed(),

        _ => {
            debug!("Responding with 404 to {:?} '{}'", method, path);
            response::not_found()
        }
    }
}

/// Handles a request to `/graphql`.
async fn handle_api(req: Request, ctx: &Context) -> Response {
    let before = Instant::now();

    let body = match req.into_body().collect().await {
        Ok(body) => body.to_bytes(),
        Err(e) => {
            warn!("Failed to read body of API request: {e}");
            return response::bad_request("could not read request body".into());
        }
    };

    let request = match serde_json::from_slice::<GraphQLBatchRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Received invalid GraphQL request: {e}");
            return response::bad_request(format!("invalid GraphQL request: {e}"));
        }
    };

    let api_context = api::Context {
        db: Session::new(Arc::clone(&ctx.store)),
    };
    let result = request.execute(&ctx.api_root, &api_context).await;
    let status = if result.is_ok() { StatusCode::OK } else { StatusCode::BAD_REQUEST };

    let out = match serde_json::to_vec(&result) {
        Ok(body) => response::json(status, body),
        Err(e) => {
            error!("Failed to serialize GraphQL response: {e}");
            response::internal_server_error()
        }
    };

    debug!(
        "Finished /graphql query in {:.2?} (with {} store operations)",
        before.elapsed(),
        api_context.db.num_ops(),
    );

    out
}
