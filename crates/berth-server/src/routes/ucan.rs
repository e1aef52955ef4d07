//! `POST /`: capability invocation transport.
//!
//! The body is a signed invocation envelope. The response is a DAG-CBOR
//! container holding the signed receipt and any blocks the receipt refers
//! to, such as the location commitment issued by `/blob/accept`. Failed
//! invocations still get a receipt, carrying the error.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use berth_core::error::BerthResult;
use berth_core::RequestContext;
use berth_ucan::invocation::validate;
use berth_ucan::{codec, issue_receipt, Failure, Invocation, Outcome};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use tracing::{info, warn};

use super::request_context;
use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::Executed;

/// Content type of invocation requests and responses
pub const DAG_CBOR_CONTENT_TYPE: &str = "application/vnd.ipld.dag-cbor";

/// Response body of `POST /`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseContainer {
    pub blocks: Vec<ByteBuf>,
    #[serde(with = "serde_bytes")]
    pub receipt: Vec<u8>,
}

pub async fn invoke(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let invocation = Invocation::decode(&body)?;
    let command = invocation.payload().cmd.clone();
    info!(command = %command, issuer = %invocation.payload().iss, "invocation received");

    let (ctx, _guard) = request_context();
    let (out, blocks) = match execute(&state, &ctx, &invocation).await {
        Ok(Executed { out, blocks }) => (Outcome::Ok(out), blocks),
        Err(err) => {
            warn!(command = %command, error = %err, "invocation failed");
            (Outcome::Error(Failure::from(&err)), Vec::new())
        },
    };

    let receipt = issue_receipt(state.service.signer(), invocation.link(), out)?;
    let container = ResponseContainer {
        blocks: blocks.into_iter().map(ByteBuf::from).collect(),
        receipt: receipt.as_bytes().to_vec(),
    };
    let bytes = codec::to_vec(&container)?;

    Ok(([(CONTENT_TYPE, DAG_CBOR_CONTENT_TYPE)], bytes).into_response())
}

async fn execute(
    state: &AppState,
    ctx: &RequestContext,
    invocation: &Invocation,
) -> BerthResult<Executed> {
    validate(invocation)?;
    let handler = state.registry.get(&invocation.payload().cmd)?;
    handler.execute(&state.service, ctx, invocation).await
}
