use crate::store::Store;
use futures::future::join_all;
use piecework_core::{FilterVariant, Message, PieceInfo, SharedError, contain_panic};
use std::sync::Arc;
use tracing::error;

/// Store of filters.
pub type FilterStore = Store<FilterVariant>;

/// A filter that failed while handling a message.
#[derive(Debug, Clone)]
pub struct FilterFault {
    /// The failing filter.
    pub filter: PieceInfo,
    /// What went wrong.
    pub error: SharedError,
}

/// Outcome of dispatching one message to the filters.
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    /// Names of the filters whose body ran, in registration order.
    pub ran: Vec<String>,
    /// Filters that failed.
    pub faults: Vec<FilterFault>,
}

impl Store<FilterVariant> {
    /// Hand `message` to every applicable filter.
    ///
    /// `should_run` is checked for each enabled filter first; the bodies
    /// that pass run concurrently. A failing or panicking filter never stops
    /// the others and is returned as a fault instead of propagating.
    pub async fn run(&self, message: &Arc<Message>) -> FilterReport {
        let filters: Vec<_> = self
            .values()
            .filter(|filter| filter.should_run(message))
            .collect();

        let results = join_all(
            filters
                .iter()
                .map(|filter| contain_panic(filter.behavior().run_dyn(message.clone()))),
        )
        .await;

        let mut report = FilterReport::default();
        for (filter, result) in filters.iter().zip(results) {
            report.ran.push(filter.name().to_string());
            if let Err(err) = result {
                error!(filter = filter.name(), error = %err, "filter failed");
                report.faults.push(FilterFault {
                    filter: filter.info(),
                    error: Arc::from(err),
                });
            }
        }
        report
    }
}
