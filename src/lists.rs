//! Adding looked-up titles to a user's series and movie lists.

use crate::database::UserDb;
use crate::error::{AppError, AppResult};
use crate::model::{MediaKind, MediaRecord};
use crate::omdb::OmdbClient;

/// What a submission did to the user's lists.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Added,
    /// OMDb had nothing of the requested kind; nothing was stored.
    Missed,
    /// The user vanished between session lookup and append.
    UnknownUser,
}

/// Appends `record` to the list matching its kind. Entries are never
/// de-duplicated.
pub fn append(db: &sled::Db, user_id: u64, record: &MediaRecord) -> AppResult<bool> {
    Ok(db.append_record(user_id, record)?.is_some())
}

/// Looks `query` up as `kind` and appends the match to the user's list.
///
/// Only `TransportFailure` and store errors are returned as `Err`.
pub async fn submit_title(
    db: &sled::Db,
    omdb: &OmdbClient,
    user_id: u64,
    query: &str,
    kind: MediaKind,
) -> AppResult<SubmitOutcome> {
    let record = match omdb.lookup(query, kind).await {
        Ok(record) => record,
        Err(AppError::LookupMiss { .. }) => {
            log::info!("no {} found for {:?}", kind, query);
            return Ok(SubmitOutcome::Missed);
        }
        Err(err) => return Err(err),
    };
    if append(db, user_id, &record)? {
        log::info!("user {} added {} {:?}", user_id, kind, query);
        Ok(SubmitOutcome::Added)
    } else {
        log::warn!("cannot append to missing user {}", user_id);
        Ok(SubmitOutcome::UnknownUser)
    }
}
