//! Lazy page streams
//!
//! [`paginate`] drives any [`Paginator`] against an endpoint operation and
//! exposes the result as a stream of page `data` lists. Nothing is fetched
//! until the stream is polled, and dropping it stops further calls.

use super::types::{NextPage, PaginationState, Paginator};
use crate::endpoint::EndpointOperation;
use crate::error::{Error, Result};
use crate::fetch::PageFetcher;
use crate::types::{JsonValue, Params, Record};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::debug;

/// Stream of page `data` lists
pub type PageStream = BoxStream<'static, Result<Vec<Record>>>;

/// Produce the pages of an endpoint.
///
/// `extra` is sent with every call. An error ends the stream after it has
/// been yielded.
pub fn paginate(
    fetcher: PageFetcher,
    endpoint: Arc<dyn EndpointOperation>,
    paginator: Arc<dyn Paginator>,
    extra: Params,
) -> PageStream {
    let mut first = extra.clone();
    first.extend(paginator.initial_params());

    stream::try_unfold(
        (Some(first), PaginationState::new()),
        move |(params, state)| {
            next_page(
                fetcher,
                Arc::clone(&endpoint),
                Arc::clone(&paginator),
                extra.clone(),
                params,
                state,
            )
        },
    )
    .boxed()
}

/// Parameters of the next call (`None` once finished) and the running state
type Step = (Option<Params>, PaginationState);

async fn next_page(
    fetcher: PageFetcher,
    endpoint: Arc<dyn EndpointOperation>,
    paginator: Arc<dyn Paginator>,
    extra: Params,
    params: Option<Params>,
    mut state: PaginationState,
) -> Result<Option<(Vec<Record>, Step)>> {
    let Some(params) = params else {
        return Ok(None);
    };

    let body = fetcher.fetch(endpoint.as_ref(), &params).await?;
    let records = page_records(&body)?;
    let next = paginator.process_response(&body, records.len(), &mut state)?;

    debug!(
        "{} page {}: {} records ({:?})",
        endpoint.name(),
        state.pages_fetched,
        records.len(),
        paginator.kind()
    );

    let next_params = match next {
        NextPage::Continue(cursor) => {
            let mut params = extra;
            params.extend(paginator.next_params(&cursor));
            Some(params)
        }
        NextPage::Done => None,
    };

    Ok(Some((records, (next_params, state))))
}

/// Records of the `data` list of a page
pub fn page_records(body: &JsonValue) -> Result<Vec<Record>> {
    match body.get("data") {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items.iter().cloned().map(Record::from_value).collect(),
        Some(other) => Err(Error::decode(format!(
            "page data is not a list: {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
