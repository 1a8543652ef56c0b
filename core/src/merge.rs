//! Merging of per-resource responses produced by a fan-out.

use crate::response::{Data, Response};

/// Folds an ordered list of responses into one.
///
/// - no responses: an empty, successful `Response`;
/// - one response: that response, moved out untouched;
/// - several: the first response, with `data` replaced by a `Data::List` of
///   every response's data in order (the first's own data at index 0).
///   Status and error of the first response are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMerger;

impl ResponseMerger {
    pub fn merge(&self, responses: Vec<Response>) -> Response {
        let mut responses = responses.into_iter();
        let Some(mut target) = responses.next() else {
            return Response::default();
        };
        let rest: Vec<Response> = responses.collect();
        if rest.is_empty() {
            return target;
        }

        let mut data = Vec::with_capacity(rest.len() + 1);
        data.push(std::mem::take(&mut target.data));
        data.extend(rest.into_iter().map(|r| r.data));
        target.data = Data::List(data);
        target
    }
}
